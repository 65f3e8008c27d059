use crate::access::Operation;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ServiceError;
use crate::ledger;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SendMessageReq {
    #[schema(example = 7)]
    pub to_user_id: i64,
    #[schema(example = "Schedule change")]
    pub title: Option<String>,
    #[schema(example = "Early close on Friday")]
    pub body: String,
}

/// Owner-to-staff notice. Append-only; staff read their own inbox.
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    request_body = SendMessageReq,
    responses(
        (status = 200, description = "Sent", body = Object, example = json!({
            "message": "Information sent"
        })),
        (status = 400, description = "Empty message body"),
        (status = 403, description = "Recipient is not staff, or caller is not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn send(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<SendMessageReq>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::SendMessage)?;

    let body = payload.body.trim();
    if body.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Select staff and enter a message"
        })));
    }

    let recipient = ledger::resolve_subject(pool.get_ref(), payload.to_user_id).await?;

    sqlx::query("INSERT INTO messages (to_user_id, title, body, created_at) VALUES (?, ?, ?, ?)")
        .bind(recipient.id)
        .bind(&payload.title)
        .bind(body)
        .bind(config.now_local())
        .execute(pool.get_ref())
        .await?;

    info!(to_user_id = recipient.id, "message sent");
    Ok(HttpResponse::Ok().json(json!({ "message": "Information sent" })))
}
