use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};

use crate::db::Database;

/// Role the provisioning path assigns to a workspace creator. Seeded by
/// migration together with the rest of the catalog; services never create
/// roles.
pub const ROLE_OWNER: &str = "Owner";

#[derive(Debug, Clone)]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Clone)]
pub struct RoleStore {
    pool: Pool<Sqlite>,
}

impl RoleStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<RoleRecord>> {
        let row = sqlx::query("SELECT id, name, permissions FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    /// Same lookup on an explicit connection, for use inside a provisioning
    /// transaction.
    pub async fn find_by_name_in(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<RoleRecord>> {
        let row = sqlx::query("SELECT id, name, permissions FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Self::map_row).transpose()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<RoleRecord>> {
        let row = sqlx::query("SELECT id, name, permissions FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    pub async fn list_all(&self) -> Result<Vec<RoleRecord>> {
        let rows = sqlx::query("SELECT id, name, permissions FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::map_row).collect()
    }

    fn map_row(row: SqliteRow) -> Result<RoleRecord> {
        let name: String = row.get("name");
        let permissions: String = row.get("permissions");
        let permissions = serde_json::from_str(&permissions)
            .with_context(|| format!("invalid permissions payload for role {name}"))?;

        Ok(RoleRecord {
            id: row.get("id"),
            name,
            permissions,
        })
    }
}
