use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};
use uuid::Uuid;

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub picture: Option<String>,
    pub current_workspace: Option<String>,
    pub created_at: i64,
}

impl UserRecord {
    /// Copy of the record safe to hand back to callers outside the identity
    /// layer: the password hash is never part of a returned user.
    pub fn sanitized(self) -> UserRecord {
        UserRecord {
            password_hash: None,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub picture: Option<&'a str>,
}

#[derive(Clone)]
pub struct UserStore {
    pool: Pool<Sqlite>,
}

impl UserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Insert a user on an explicit connection so the write can take part in a
    /// caller-owned transaction.
    pub async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        new: NewUser<'_>,
    ) -> Result<UserRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, picture, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(new.email)
        .bind(new.name)
        .bind(new.password_hash)
        .bind(new.picture)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .context("failed to insert user")?;

        Ok(UserRecord {
            id,
            email: new.email.to_owned(),
            name: new.name.to_owned(),
            password_hash: new.password_hash.map(ToOwned::to_owned),
            picture: new.picture.map(ToOwned::to_owned),
            current_workspace: None,
            created_at,
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, picture, current_workspace, created_at \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_row))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, picture, current_workspace, created_at \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_row))
    }

    pub async fn set_current_workspace_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET current_workspace = ? WHERE id = ?")
            .bind(workspace_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .context("failed to update current workspace")?;
        Ok(())
    }

    /// Detach every user whose advisory current workspace points at the given
    /// workspace. Used when a workspace is deleted.
    pub async fn clear_current_workspace_in(
        &self,
        conn: &mut SqliteConnection,
        workspace_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE users SET current_workspace = NULL WHERE current_workspace = ?")
            .bind(workspace_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    fn map_row(row: SqliteRow) -> UserRecord {
        UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_hash: row.get::<Option<String>, _>("password_hash"),
            picture: row.get::<Option<String>, _>("picture"),
            current_workspace: row.get::<Option<String>, _>("current_workspace"),
            created_at: row.get::<i64, _>("created_at"),
        }
    }
}
