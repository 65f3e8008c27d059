use crate::access::Operation;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ServiceError;
use crate::ledger::{self, MarkOutcome, RecordEdit, ToggleOutcome};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ScanReq {
    /// Raw payload read off a staff badge, e.g. `ATTEND:7`
    #[schema(example = "ATTEND:7")]
    pub qr_value: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ToggleReq {
    #[schema(example = 7)]
    pub user_id: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkReq {
    #[schema(example = 7)]
    pub user_id: i64,
    #[schema(example = "2026-08-06", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "18:00:00", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub present: bool,
}

fn toggled_response(
    outcome: ToggleOutcome,
    username: &str,
    at: chrono::NaiveDateTime,
) -> HttpResponse {
    let verb = match outcome {
        ToggleOutcome::CheckedIn => "Checked IN",
        ToggleOutcome::CheckedOut => "Checked OUT",
    };
    HttpResponse::Ok().json(json!({
        "message": format!("{verb} {username} at {}", at.format("%Y-%m-%d %H:%M:%S")),
        "outcome": outcome,
    }))
}

/// QR scan: one trigger, alternating check-in/check-out.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/scan",
    request_body = ScanReq,
    responses(
        (status = 200, description = "Toggled", body = Object, example = json!({
            "message": "Checked IN alice at 2026-08-06 09:00:00",
            "outcome": "checked_in"
        })),
        (status = 400, description = "Malformed QR payload"),
        (status = 403, description = "Not a staff badge, or caller is not the owner"),
        (status = 503, description = "Storage unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn scan(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<ScanReq>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ToggleAttendance)?;

    let subject = ledger::resolve_token(pool.get_ref(), &payload.qr_value).await?;
    let at = config.now_local();
    let outcome = ledger::toggle(pool.get_ref(), subject.id, at).await?;

    info!(user_id = subject.id, username = %subject.username, ?outcome, "attendance toggled by scan");
    Ok(toggled_response(outcome, &subject.username, at))
}

/// Owner manual toggle without a badge; same transition as the scan
/// path.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/toggle",
    request_body = ToggleReq,
    responses(
        (status = 200, description = "Toggled", body = Object, example = json!({
            "message": "Checked OUT alice at 2026-08-06 18:00:00",
            "outcome": "checked_out"
        })),
        (status = 403, description = "Subject is not staff, or caller is not the owner"),
        (status = 503, description = "Storage unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn toggle(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<ToggleReq>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ToggleAttendance)?;

    let subject = ledger::resolve_subject(pool.get_ref(), payload.user_id).await?;
    let at = config.now_local();
    let outcome = ledger::toggle(pool.get_ref(), subject.id, at).await?;

    info!(user_id = subject.id, username = %subject.username, ?outcome, "attendance toggled manually");
    Ok(toggled_response(outcome, &subject.username, at))
}

/// Day-granularity upsert for back-office corrections; can record an
/// explicit Absent day.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/mark",
    request_body = MarkReq,
    responses(
        (status = 200, description = "Marked", body = Object, example = json!({
            "message": "Attendance marked",
            "outcome": "created"
        })),
        (status = 400, description = "Check-out before check-in"),
        (status = 403, description = "Subject is not staff, or caller is not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<MarkReq>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::MarkAttendance)?;

    let subject = ledger::resolve_subject(pool.get_ref(), payload.user_id).await?;
    let outcome = ledger::mark_day(
        pool.get_ref(),
        subject.id,
        payload.date,
        payload.check_in,
        payload.check_out,
        payload.present,
    )
    .await?;

    let message = match outcome {
        MarkOutcome::Created => format!("Attendance marked for '{}'", subject.username),
        MarkOutcome::Updated => format!("Attendance updated for '{}'", subject.username),
    };
    info!(user_id = subject.id, date = %payload.date, ?outcome, "manual mark");
    Ok(HttpResponse::Ok().json(json!({ "message": message, "outcome": outcome })))
}

/// Overwrite one record's fields.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{id}",
    params(("id", Path, description = "Record ID")),
    request_body = RecordEdit,
    responses(
        (status = 200, description = "Record updated"),
        (status = 400, description = "Check-out before check-in"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn edit(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<RecordEdit>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::EditAttendance)?;

    ledger::edit_record(pool.get_ref(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Record updated" })))
}

/// Remove one record unconditionally.
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{id}",
    params(("id", Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::DeleteAttendance)?;

    ledger::delete_record(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Record deleted" })))
}
