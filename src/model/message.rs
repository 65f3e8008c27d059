use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Owner-authored, staff-readable, append-only.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Message {
    pub id: i64,
    pub to_user_id: i64,
    pub title: Option<String>,
    pub body: String,
    #[schema(example = "2026-08-06 09:00:00", value_type = String)]
    pub created_at: NaiveDateTime,
}
