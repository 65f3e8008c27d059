use crate::access::Operation;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ServiceError;
use crate::{identity, ledger, qr};
use crate::model::role::Role;
use crate::utils::{username_cache, username_filter};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateStaff {
    #[schema(example = "alice")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserStatusRow {
    pub id: i64,
    pub username: String,
    pub role_id: u8,
    #[schema(example = "Present")]
    pub today_status: String,
}

/// Add a staff account and hand back its badge token.
#[utoipa::path(
    post,
    path = "/api/v1/staff",
    request_body = CreateStaff,
    responses(
        (status = 201, description = "Staff added", body = Object, example = json!({
            "message": "Staff 'alice' added",
            "id": 7,
            "qr_token": "ATTEND:7"
        })),
        (status = 403, description = "Caller is not the owner"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn create_staff(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateStaff>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::CreateUser)?;

    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Username and password must not be empty"
        })));
    }

    let staff_id =
        identity::create_user(pool.get_ref(), username, &payload.password, Role::Staff).await?;

    username_filter::insert(username);
    username_cache::mark_taken(username).await;

    info!(user_id = staff_id, username = %username, "staff added");
    Ok(HttpResponse::Created().json(json!({
        "message": format!("Staff '{username}' added"),
        "id": staff_id,
        "qr_token": qr::token_for(staff_id),
    })))
}

/// Every user with their presence for today, owners first.
#[utoipa::path(
    get,
    path = "/api/v1/staff",
    responses(
        (status = 200, description = "Users with today's status", body = Vec<UserStatusRow>),
        (status = 403, description = "Caller is not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_staff(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ViewUsers)?;

    let rows = sqlx::query_as::<_, UserStatusRow>(
        "SELECT u.id, u.username, u.role_id, \
           CASE WHEN EXISTS ( \
             SELECT 1 FROM attendance a \
             WHERE a.user_id = u.id AND a.date = ? AND a.is_present = 1 \
           ) THEN 'Present' ELSE 'Absent' END AS today_status \
         FROM users u ORDER BY u.role_id, u.username",
    )
    .bind(config.today())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Delete a staff member; their attendance rows and messages go with
/// them.
#[utoipa::path(
    delete,
    path = "/api/v1/staff/{id}",
    params(("id", Path, description = "User ID")),
    responses(
        (status = 200, description = "Staff deleted", body = Object, example = json!({
            "message": "Staff 'alice' deleted"
        })),
        (status = 403, description = "Subject is not staff, or caller is not the owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn delete_staff(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::DeleteUser)?;

    let user_id = path.into_inner();
    // Owners are not deletable through this endpoint.
    let subject = ledger::resolve_subject(pool.get_ref(), user_id).await?;
    let username = identity::delete_user(pool.get_ref(), subject.id).await?;

    username_filter::remove(&username);
    username_cache::forget(&username).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Staff '{username}' deleted")
    })))
}

/// A user's badge QR as SVG, for printing.
#[utoipa::path(
    get,
    path = "/api/v1/staff/{id}/qr",
    params(("id", Path, description = "User ID")),
    responses(
        (status = 200, description = "SVG image", body = String, content_type = "image/svg+xml"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn staff_qr(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    auth.authorize(Operation::ViewUserQr)?;

    let user_id = path.into_inner();
    identity::find_user(pool.get_ref(), user_id)
        .await?
        .ok_or(ServiceError::RecordNotFound)?;

    let svg = qr::render_svg(&qr::token_for(user_id))?;
    Ok(HttpResponse::Ok()
        .content_type("image/svg+xml")
        .body(svg))
}
