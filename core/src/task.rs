use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::db::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<TaskStatus> {
        match value {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<i64>,
    pub created_at: i64,
}

/// Dashboard counters for one workspace. The three counts are independent
/// point-in-time queries with no consistency guarantee between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskAnalytics {
    pub total_tasks: i64,
    pub overdue_tasks: i64,
    pub completed_tasks: i64,
}

#[derive(Clone)]
pub struct TaskStore {
    pool: Pool<Sqlite>,
}

impl TaskStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    pub async fn create(
        &self,
        workspace_id: &str,
        title: &str,
        status: TaskStatus,
        due_date: Option<i64>,
    ) -> Result<TaskRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO tasks (id, workspace_id, title, status, due_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(title)
        .bind(status.as_str())
        .bind(due_date)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("failed to insert task")?;

        Ok(TaskRecord {
            id,
            workspace_id: workspace_id.to_owned(),
            title: title.to_owned(),
            status,
            due_date,
            created_at,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(
            "SELECT id, workspace_id, title, status, due_date, created_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    /// Overdue means a due date strictly before `now` on a task that is not
    /// done yet.
    pub async fn analytics(&self, workspace_id: &str, now: i64) -> Result<TaskAnalytics> {
        let total_tasks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE workspace_id = ?")
                .bind(workspace_id)
                .fetch_one(&self.pool)
                .await?;

        let overdue_tasks: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks \
             WHERE workspace_id = ? AND due_date IS NOT NULL AND due_date < ? AND status != ?",
        )
        .bind(workspace_id)
        .bind(now)
        .bind(TaskStatus::Done.as_str())
        .fetch_one(&self.pool)
        .await?;

        let completed_tasks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE workspace_id = ? AND status = ?")
                .bind(workspace_id)
                .bind(TaskStatus::Done.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(TaskAnalytics {
            total_tasks,
            overdue_tasks,
            completed_tasks,
        })
    }

    fn map_row(row: SqliteRow) -> Result<TaskRecord> {
        let status: String = row.get("status");
        let status =
            TaskStatus::parse(&status).ok_or_else(|| anyhow!("unknown task status: {status}"))?;

        Ok(TaskRecord {
            id: row.get("id"),
            workspace_id: row.get("workspace_id"),
            title: row.get("title"),
            status,
            due_date: row.get::<Option<i64>, _>("due_date"),
            created_at: row.get::<i64, _>("created_at"),
        })
    }
}
