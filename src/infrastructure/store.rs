use tokio::sync::OnceCell;

use super::sqlite_repo::SqliteTaskRepository;
use crate::domain::repository::{StorageResult, TaskRepository};

/// Handle to the task database that opens it on first use.
///
/// Concurrent first callers share a single open attempt, and every later call
/// returns the same repository. A failed open leaves the handle empty, so the
/// next call tries again.
pub struct TaskStore {
    database_url: String,
    repo: OnceCell<SqliteTaskRepository>,
}

impl TaskStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self { database_url: database_url.into(), repo: OnceCell::new() }
    }

    pub fn database_url(&self) -> &str { &self.database_url }

    pub async fn repository(&self) -> StorageResult<&SqliteTaskRepository> {
        self.repo
            .get_or_try_init(|| async {
                let repo = SqliteTaskRepository::connect(&self.database_url).await?;
                repo.init().await?;
                tracing::info!(database_url = %self.database_url, "task store ready");
                Ok(repo)
            })
            .await
    }
}
