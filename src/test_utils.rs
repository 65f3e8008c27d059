use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::db;
use crate::model::role::Role;

/// Fresh in-memory database with the full schema. Single connection so
/// every query sees the same memory store.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::create_schema(&pool).await.expect("schema");
    pool
}

pub async fn seed_user(pool: &SqlitePool, username: &str, role: Role) -> i64 {
    sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind("not-a-real-hash")
        .bind(role.id())
        .execute(pool)
        .await
        .expect("seed user")
        .last_insert_rowid()
}

pub fn ts(s: &str) -> chrono::NaiveDateTime {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("timestamp literal")
}

pub fn day(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date literal")
}
