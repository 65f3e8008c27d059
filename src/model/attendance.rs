use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    #[schema(example = "2026-08-06", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-08-06 09:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-08-06 18:00:00", value_type = Option<String>)]
    pub check_out: Option<NaiveDateTime>,
    pub is_present: bool,
}
