use crate::access::Operation;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ServiceError;
use crate::model::message::Message;
use crate::{ledger, qr};
use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::SqlitePool;

/// Own attendance rows, newest first (last 30).
#[utoipa::path(
    get,
    path = "/api/v1/me/attendance",
    responses(
        (status = 200, description = "Own records", body = Vec<crate::model::attendance::AttendanceRecord>)
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ViewOwnRecords)?;

    let rows = ledger::user_log(pool.get_ref(), auth.user_id, 30).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Presence for today in the shop's reference timezone.
#[utoipa::path(
    get,
    path = "/api/v1/me/status",
    responses(
        (status = 200, description = "Today's presence", body = Object, example = json!({
            "today_status": "Present"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_status(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ViewOwnStatus)?;

    let status = ledger::today_status(pool.get_ref(), auth.user_id, config.today()).await?;
    Ok(HttpResponse::Ok().json(json!({ "today_status": status })))
}

/// Own inbox, newest first (last 20).
#[utoipa::path(
    get,
    path = "/api/v1/me/messages",
    responses(
        (status = 200, description = "Own messages", body = Vec<crate::model::message::Message>)
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_messages(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ViewOwnMessages)?;

    let messages = sqlx::query_as::<_, Message>(
        "SELECT id, to_user_id, title, body, created_at FROM messages \
         WHERE to_user_id = ? ORDER BY created_at DESC, id DESC LIMIT 20",
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// Own badge QR as SVG.
#[utoipa::path(
    get,
    path = "/api/v1/me/qr",
    responses(
        (status = 200, description = "SVG image", body = String, content_type = "image/svg+xml")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_qr(auth: AuthUser) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ViewOwnQr)?;

    let svg = qr::render_svg(&qr::token_for(auth.user_id))?;
    Ok(HttpResponse::Ok()
        .content_type("image/svg+xml")
        .body(svg))
}
