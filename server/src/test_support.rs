#![allow(dead_code)]

use crewbase_core::{config::AppConfig, db::Database};
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

use crate::{
    identity::RegisteredUser,
    state::{AppState, build_state},
    utils::db::run_migrations,
};

/// Fresh migrated database plus an assembled state. The TempDir guard must be
/// kept alive for the duration of the test.
pub(crate) async fn setup_state() -> (TempDir, Database, AppState) {
    let dir = TempDir::new().expect("tempdir");
    let config = AppConfig {
        database_path: dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };

    let database = Database::connect(&config).await.expect("connect");
    run_migrations(database.pool()).await.expect("migrations");
    let state = build_state(&database);

    (dir, database, state)
}

pub(crate) async fn register_user(
    state: &AppState,
    email: &str,
    name: &str,
    password: &str,
) -> RegisteredUser {
    state
        .identity_service
        .register_user(email, name, password)
        .await
        .expect("register user")
}

pub(crate) async fn count_rows(pool: &Pool<Sqlite>, table: &str) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
