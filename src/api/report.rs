use crate::access::Operation;
use crate::auth::auth::AuthUser;
use crate::error::ServiceError;
use crate::ledger;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// Inclusive lower bound (YYYY-MM-DD)
    #[param(example = "2026-08-01", value_type = Option<String>)]
    pub from_date: Option<NaiveDate>,
    /// Inclusive upper bound (YYYY-MM-DD)
    #[param(example = "2026-08-31", value_type = Option<String>)]
    pub to_date: Option<NaiveDate>,
}

/// The owner dashboard table: every record joined with its user,
/// newest check-in first.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(RangeQuery),
    responses(
        (status = 200, description = "Filtered attendance", body = Vec<crate::ledger::LedgerRow>),
        (status = 403, description = "Caller is not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::QueryAttendance)?;

    let rows = ledger::query(pool.get_ref(), query.from_date, query.to_date).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// CSV download over the same filter as the dashboard table.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/export",
    params(RangeQuery),
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 403, description = "Caller is not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ExportReport)?;

    let bytes = ledger::export_csv(pool.get_ref(), query.from_date, query.to_date).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=attendance_export.csv",
        ))
        .body(bytes))
}
