#![allow(dead_code)]

use anyhow::Result;
use tempfile::TempDir;

use crate::{
    config::AppConfig,
    db::Database,
    provision::WorkspaceProvisioner,
    user::{NewUser, UserStore},
};

/// Temp-file SQLite database with migrations applied. The TempDir guard keeps
/// the file alive for the duration of the test.
pub(crate) async fn setup_database() -> Result<(TempDir, Database)> {
    let temp_dir = tempfile::tempdir()?;
    let config = AppConfig {
        database_path: temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };

    let database = Database::connect(&config).await?;
    sqlx::migrate!("../server/migrations")
        .run(database.pool())
        .await?;
    Ok((temp_dir, database))
}

/// One user owning one fully provisioned workspace, returning their ids.
pub(crate) async fn seed_user_and_workspace(database: &Database) -> Result<(String, String)> {
    let users = UserStore::new(database);
    let provisioner = WorkspaceProvisioner::new(database);

    let mut tx = database.pool().begin().await?;
    let user = users
        .create_in(
            &mut tx,
            NewUser {
                email: "seed@example.com",
                name: "Seed",
                password_hash: None,
                picture: None,
            },
        )
        .await?;
    let provisioned = provisioner
        .provision_in(&mut tx, &user, "Seed Workspace", None)
        .await?;
    tx.commit().await?;

    Ok((user.id, provisioned.workspace.id))
}
