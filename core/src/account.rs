use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};
use uuid::Uuid;

use crate::db::Database;

/// Credential origin for an account binding. The string encoding is stored in
/// the database and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Email,
    Google,
    Github,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Email => "email",
            Provider::Google => "google",
            Provider::Github => "github",
        }
    }

    pub fn parse(value: &str) -> Option<Provider> {
        match value {
            "email" => Some(Provider::Email),
            "google" => Some(Provider::Google),
            "github" => Some(Provider::Github),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: String,
    pub user_id: String,
    pub provider: Provider,
    pub provider_id: String,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct AccountStore {
    pool: Pool<Sqlite>,
}

impl AccountStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Accounts are immutable once written; this is the only write path.
    pub async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        provider: Provider,
        provider_id: &str,
    ) -> Result<AccountRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO accounts (id, user_id, provider, provider_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(provider.as_str())
        .bind(provider_id)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .context("failed to insert account")?;

        Ok(AccountRecord {
            id,
            user_id: user_id.to_owned(),
            provider,
            provider_id: provider_id.to_owned(),
            created_at,
        })
    }

    pub async fn find_by_provider(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<AccountRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, provider, provider_id, created_at \
             FROM accounts WHERE provider = ? AND provider_id = ?",
        )
        .bind(provider.as_str())
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    fn map_row(row: SqliteRow) -> Result<AccountRecord> {
        let provider: String = row.get("provider");
        let provider = Provider::parse(&provider)
            .ok_or_else(|| anyhow!("unknown account provider: {provider}"))?;

        Ok(AccountRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            provider,
            provider_id: row.get("provider_id"),
            created_at: row.get::<i64, _>("created_at"),
        })
    }
}
