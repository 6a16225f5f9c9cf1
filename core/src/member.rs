use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};

use crate::db::Database;

/// One (user, workspace) binding. The table's primary key enforces at most one
/// membership per pair, which makes this the authorization unit for workspace
/// access.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub user_id: String,
    pub workspace_id: String,
    pub role_id: String,
    pub joined_at: i64,
}

#[derive(Debug, Clone)]
pub struct MemberWithRole {
    pub user_id: String,
    pub workspace_id: String,
    pub role_id: String,
    pub role_name: String,
    pub joined_at: i64,
}

#[derive(Debug, Clone)]
pub struct MemberWithUser {
    pub user_id: String,
    pub workspace_id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub role_id: String,
    pub role_name: String,
    pub joined_at: i64,
}

#[derive(Clone)]
pub struct MemberStore {
    pool: Pool<Sqlite>,
}

impl MemberStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    pub async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        workspace_id: &str,
        role_id: &str,
    ) -> Result<MemberRecord> {
        let joined_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO members (user_id, workspace_id, role_id, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(workspace_id)
        .bind(role_id)
        .bind(joined_at)
        .execute(&mut *conn)
        .await
        .context("failed to insert member")?;

        Ok(MemberRecord {
            user_id: user_id.to_owned(),
            workspace_id: workspace_id.to_owned(),
            role_id: role_id.to_owned(),
            joined_at,
        })
    }

    pub async fn find(&self, workspace_id: &str, user_id: &str) -> Result<Option<MemberRecord>> {
        let row = sqlx::query(
            "SELECT user_id, workspace_id, role_id, joined_at \
             FROM members WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_row))
    }

    /// Reassign a member's role. Returns false when no membership matched.
    pub async fn set_role(
        &self,
        workspace_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE members SET role_id = ? WHERE workspace_id = ? AND user_id = ?")
                .bind(role_id)
                .bind(workspace_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_with_roles(&self, workspace_id: &str) -> Result<Vec<MemberWithRole>> {
        let rows = sqlx::query(
            "SELECT m.user_id, m.workspace_id, m.joined_at, r.id AS role_id, r.name AS role_name \
             FROM members m JOIN roles r ON r.id = m.role_id \
             WHERE m.workspace_id = ? ORDER BY m.joined_at, m.user_id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MemberWithRole {
                user_id: row.get("user_id"),
                workspace_id: row.get("workspace_id"),
                role_id: row.get("role_id"),
                role_name: row.get("role_name"),
                joined_at: row.get::<i64, _>("joined_at"),
            })
            .collect())
    }

    pub async fn list_with_users(&self, workspace_id: &str) -> Result<Vec<MemberWithUser>> {
        let rows = sqlx::query(
            "SELECT m.user_id, m.workspace_id, m.joined_at, u.name, u.email, u.picture, \
                    r.id AS role_id, r.name AS role_name \
             FROM members m \
             JOIN users u ON u.id = m.user_id \
             JOIN roles r ON r.id = m.role_id \
             WHERE m.workspace_id = ? ORDER BY m.joined_at, m.user_id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MemberWithUser {
                user_id: row.get("user_id"),
                workspace_id: row.get("workspace_id"),
                name: row.get("name"),
                email: row.get("email"),
                picture: row.get::<Option<String>, _>("picture"),
                role_id: row.get("role_id"),
                role_name: row.get("role_name"),
                joined_at: row.get::<i64, _>("joined_at"),
            })
            .collect())
    }

    fn map_row(row: SqliteRow) -> MemberRecord {
        MemberRecord {
            user_id: row.get("user_id"),
            workspace_id: row.get("workspace_id"),
            role_id: row.get("role_id"),
            joined_at: row.get::<i64, _>("joined_at"),
        }
    }
}
