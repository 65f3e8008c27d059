use sqlx::SqlitePool;
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::error::ServiceError;
use crate::model::role::Role;
use crate::models::UserSql;

/// Insert a new user with a freshly hashed password.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    role: Role,
) -> Result<i64, ServiceError> {
    let hashed = hash_password(password);

    let result = sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(role.id())
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(e) => {
            // UNIQUE violation on username
            if let sqlx::Error::Database(db_err) = &e {
                if matches!(db_err.code().as_deref(), Some("2067") | Some("1555")) {
                    return Err(ServiceError::DuplicateUsername);
                }
            }
            Err(e.into())
        }
    }
}

/// Verify a credential pair. The failure is identical whether the
/// username exists or not.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<UserSql, ServiceError> {
    let user = sqlx::query_as::<_, UserSql>(
        "SELECT id, username, password, role_id FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        return Err(ServiceError::AuthFailure);
    };

    if verify_password(password, &user.password).is_err() {
        return Err(ServiceError::AuthFailure);
    }

    Ok(user)
}

pub async fn find_user(pool: &SqlitePool, user_id: i64) -> Result<Option<UserSql>, ServiceError> {
    let user = sqlx::query_as::<_, UserSql>(
        "SELECT id, username, password, role_id FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn owner_exists(pool: &SqlitePool) -> Result<bool, ServiceError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE role_id = ? LIMIT 1)",
    )
    .bind(Role::Owner.id())
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Remove a user together with every attendance row, message and
/// refresh token that references them. One transaction, all or nothing.
/// Returns the deleted username.
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> Result<String, ServiceError> {
    let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::RecordNotFound)?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM attendance WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM messages WHERE to_user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(user_id, username = %username, "user deleted with attendance and messages");
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::test_utils::{setup_test_db, ts};

    #[actix_web::test]
    async fn duplicate_username_is_rejected() {
        let pool = setup_test_db().await;

        create_user(&pool, "dana", "pw1", Role::Staff).await.unwrap();
        let err = create_user(&pool, "dana", "pw2", Role::Staff)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::DuplicateUsername);
    }

    #[actix_web::test]
    async fn authentication_failure_is_uniform() {
        let pool = setup_test_db().await;
        create_user(&pool, "erin", "correct horse", Role::Staff)
            .await
            .unwrap();

        // Unknown user and wrong password must be indistinguishable.
        let unknown = authenticate(&pool, "ghost", "whatever").await.unwrap_err();
        let wrong_pw = authenticate(&pool, "erin", "battery staple")
            .await
            .unwrap_err();
        assert_eq!(unknown, ServiceError::AuthFailure);
        assert_eq!(unknown, wrong_pw);

        let user = authenticate(&pool, "erin", "correct horse").await.unwrap();
        assert_eq!(user.role_id, Role::Staff.id());
    }

    #[actix_web::test]
    async fn owner_bootstrap_probe() {
        let pool = setup_test_db().await;
        assert!(!owner_exists(&pool).await.unwrap());

        create_user(&pool, "boss", "pw", Role::Owner).await.unwrap();
        assert!(owner_exists(&pool).await.unwrap());
    }

    #[actix_web::test]
    async fn deleting_a_user_cascades_to_ledger_and_messages() {
        let pool = setup_test_db().await;
        let gone = create_user(&pool, "gone", "pw", Role::Staff).await.unwrap();
        let kept = create_user(&pool, "kept", "pw", Role::Staff).await.unwrap();

        ledger::toggle(&pool, gone, ts("2026-03-02 09:00:00"))
            .await
            .unwrap();
        ledger::toggle(&pool, gone, ts("2026-03-02 17:00:00"))
            .await
            .unwrap();
        ledger::toggle(&pool, kept, ts("2026-03-02 09:05:00"))
            .await
            .unwrap();

        sqlx::query("INSERT INTO messages (to_user_id, title, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(gone)
            .bind("notice")
            .bind("please see me")
            .bind(ts("2026-03-02 12:00:00"))
            .execute(&pool)
            .await
            .unwrap();

        let username = delete_user(&pool, gone).await.unwrap();
        assert_eq!(username, "gone");

        let rows = ledger::query(&pool, None, None).await.unwrap();
        assert!(rows.iter().all(|r| r.username != "gone"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "kept");

        let messages: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE to_user_id = ?")
                .bind(gone)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(messages, 0);
    }

    #[actix_web::test]
    async fn deleting_an_unknown_user_is_an_error() {
        let pool = setup_test_db().await;
        let err = delete_user(&pool, 999).await.unwrap_err();
        assert_eq!(err, ServiceError::RecordNotFound);
    }
}
