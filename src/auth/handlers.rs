use crate::{
    auth::jwt::{generate_access_token, generate_refresh_token, verify_token},
    config::Config,
    error::ServiceError,
    identity,
    model::role::Role,
    models::{Claims, LoginReqDto, RegisterReq, TokenType},
    utils::{username_cache, username_filter},
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

// auth end points

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_username_available(username: &str, pool: &SqlitePool) -> bool {
    let username = username.to_lowercase();

    // 1️⃣ Cuckoo filter — fast negative
    if !username_filter::might_exist(&username) {
        return true;
    }

    // 2️⃣ Moka cache — fast positive
    if username_cache::is_taken(&username).await {
        return false;
    }

    // 3️⃣ Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// First-run bootstrap: while no owner exists, registration creates the
/// owner account. Afterwards self-registration is closed unless the
/// deployment allows several owners; staff accounts are always created
/// by an owner through the staff endpoint.
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    let username = user.username.trim();
    let password = &user.password;

    if username.is_empty() || password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Username and password must not be empty"
        })));
    }

    if config.single_owner && identity::owner_exists(pool.get_ref()).await? {
        return Err(ServiceError::AccessDenied);
    }

    if !is_username_available(username, pool.get_ref()).await {
        return Err(ServiceError::DuplicateUsername);
    }

    let owner_id = identity::create_user(pool.get_ref(), username, password, Role::Owner).await?;

    // keep filter and cache populated
    username_filter::insert(username);
    username_cache::mark_taken(username).await;

    info!(user_id = owner_id, "owner registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "Owner registered successfully. Please log in."
    })))
}

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ServiceError::AuthFailure);
    }

    // 2️⃣ Fetch + verify. The failure is uniform either way.
    let db_user = identity::authenticate(pool.get_ref(), &user.username, &user.password).await?;

    debug!(user_id = db_user.id, "Password verified");

    // 3️⃣ Generate tokens
    let access_token = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    // 4️⃣ Store refresh token
    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");

    let expires_at = DateTime::from_timestamp(refresh_claims.exp as i64, 0)
        .map(|t| t.naive_utc())
        .unwrap_or_default();

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(db_user.id)
        .bind(&refresh_claims.jti)
        .bind(expires_at)
        .execute(pool.get_ref())
        .await?;

    // 5️⃣ Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(Utc::now().naive_utc())
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    }))
}

fn bearer_claims(req: &HttpRequest, config: &Config) -> Result<Claims, ServiceError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(ServiceError::AuthFailure)?;

    verify_token(token, &config.jwt_secret).map_err(|_| ServiceError::AuthFailure)
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    let claims = bearer_claims(&req, &config)?;

    if claims.token_type != TokenType::Refresh {
        return Err(ServiceError::AuthFailure);
    }

    // find refresh token in DB
    let record = sqlx::query_as::<_, (i64, i64, bool)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (row_id, user_id, _) = match record {
        Some(r) if !r.2 => r,
        _ => return Err(ServiceError::AuthFailure),
    };

    // revoke old refresh token
    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(row_id)
        .execute(pool.get_ref())
        .await?;

    // issue new refresh token
    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    let expires_at = DateTime::from_timestamp(new_claims.exp as i64, 0)
        .map(|t| t.naive_utc())
        .unwrap_or_default();

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(&new_claims.jti)
        .bind(expires_at)
        .execute(pool.get_ref())
        .await?;

    // new access token
    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Revoke the presented refresh token. Succeeds quietly even when the
/// token is missing or already revoked.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Ok(claims) = bearer_claims(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}
