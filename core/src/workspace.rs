use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};
use uuid::Uuid;

use crate::db::Database;

/// Name given to the workspace bootstrapped for a brand-new user.
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";

#[derive(Debug, Clone)]
pub struct WorkspaceRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct NewWorkspace<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub owner_id: &'a str,
}

/// Partial update with field-present semantics: `None` keeps the stored value,
/// `Some(None)` on the description clears it.
#[derive(Debug, Clone, Default)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone)]
pub struct WorkspaceStore {
    pool: Pool<Sqlite>,
}

impl WorkspaceStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    pub async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        new: NewWorkspace<'_>,
    ) -> Result<WorkspaceRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO workspaces (id, name, description, owner_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.owner_id)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .context("failed to insert workspace")?;

        Ok(WorkspaceRecord {
            id,
            name: new.name.to_owned(),
            description: new.description.map(ToOwned::to_owned),
            owner_id: new.owner_id.to_owned(),
            created_at,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query(
            "SELECT id, name, description, owner_id, created_at FROM workspaces WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_row))
    }

    /// Workspaces the user holds a membership in, ordered by creation time.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<WorkspaceRecord>> {
        let rows = sqlx::query(
            "SELECT w.id, w.name, w.description, w.owner_id, w.created_at \
             FROM workspaces w JOIN members m ON m.workspace_id = w.id \
             WHERE m.user_id = ? ORDER BY w.created_at, w.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    pub async fn update(&self, id: &str, patch: WorkspacePatch) -> Result<Option<WorkspaceRecord>> {
        match (patch.name, patch.description) {
            (None, None) => return self.find_by_id(id).await,
            (Some(name), None) => {
                sqlx::query("UPDATE workspaces SET name = ? WHERE id = ?")
                    .bind(&name)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            (None, Some(description)) => {
                sqlx::query("UPDATE workspaces SET description = ? WHERE id = ?")
                    .bind(description.as_deref())
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            (Some(name), Some(description)) => {
                sqlx::query("UPDATE workspaces SET name = ?, description = ? WHERE id = ?")
                    .bind(&name)
                    .bind(description.as_deref())
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
        }

        self.find_by_id(id).await
    }

    pub async fn delete_in(&self, conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn map_row(row: SqliteRow) -> WorkspaceRecord {
        WorkspaceRecord {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get::<Option<String>, _>("description"),
            owner_id: row.get("owner_id"),
            created_at: row.get::<i64, _>("created_at"),
        }
    }
}
