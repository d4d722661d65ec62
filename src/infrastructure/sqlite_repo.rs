use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};

use crate::domain::{
    repository::{StorageError, StorageResult, TaskRepository},
    task::{NewTask, Task, TaskId},
};

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self { StorageError::OperationFailed(Box::new(err)) }
}

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        prepare_sqlite_file(database_url).map_err(|e| StorageError::Unavailable(Box::new(e)))?;
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StorageError::Unavailable(Box::new(e)))?
            .create_if_missing(true);

        // An in-memory database lives and dies with its connection, so keep exactly one alive.
        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable(Box::new(e)))?;
        tracing::debug!(database_url, "task store opened");
        Ok(Self { pool })
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                complete BOOLEAN NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_all(&self) -> StorageResult<Vec<Task>> {
        let rows = sqlx::query("SELECT id, title, description, complete FROM tasks ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn insert(&self, task: &NewTask) -> StorageResult<()> {
        let result = sqlx::query("INSERT INTO tasks (title, description, complete) VALUES (?1, ?2, ?3)")
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.completed)
            .execute(&self.pool)
            .await?;
        tracing::debug!(task_id = result.last_insert_rowid(), "task inserted");
        Ok(())
    }

    async fn update(&self, task: &Task) -> StorageResult<()> {
        let result = sqlx::query("UPDATE tasks SET title = ?2, description = ?3, complete = ?4 WHERE id = ?1")
            .bind(task.id.0)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.completed)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 { return Err(StorageError::NotFound(task.id)); }
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 { return Err(StorageError::NotFound(id)); }
        Ok(())
    }
}

fn row_to_task(row: &SqliteRow) -> StorageResult<Task> {
    Ok(Task {
        id: TaskId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        completed: row.try_get("complete")?,
    })
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

/// Creates the parent directory of a file-backed database URL.
fn prepare_sqlite_file(database_url: &str) -> std::io::Result<()> {
    if is_in_memory(database_url) { return Ok(()); }
    let Some(path) = database_url.strip_prefix("sqlite://").or_else(|| database_url.strip_prefix("sqlite:")) else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() { std::fs::create_dir_all(parent)?; }
    }
    Ok(())
}
