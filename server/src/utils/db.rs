use anyhow::{Context, Error as AnyError, Result};
use sqlx::error::ErrorKind;
use sqlx::{Pool, Sqlite};
use tracing::info;

/// True when the error wraps a duplicate-key insert, so services can surface
/// a Conflict instead of an internal error.
pub fn is_unique_violation(err: &AnyError) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_error)) => {
            matches!(db_error.kind(), ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply migrations")?;
    info!("migrations applied");
    Ok(())
}
