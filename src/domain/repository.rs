use async_trait::async_trait;

use super::task::{NewTask, Task, TaskId};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store could not be opened. Nothing else can proceed.
    #[error("task store unavailable: {0}")]
    Unavailable(#[source] BoxError),
    #[error("task store operation failed: {0}")]
    OperationFailed(#[source] BoxError),
    /// Update or delete matched no row.
    #[error("task {0} not found")]
    NotFound(TaskId),
}

/// Durable storage of the task collection. Each call is atomic on its own.
#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    /// Creates the schema if it does not exist yet.
    async fn init(&self) -> StorageResult<()>;
    /// Every task, most recently created first.
    async fn list_all(&self) -> StorageResult<Vec<Task>>;
    /// Persists `task` under a freshly assigned identifier.
    async fn insert(&self, task: &NewTask) -> StorageResult<()>;
    /// Replaces all fields of the row keyed by `task.id`.
    async fn update(&self, task: &Task) -> StorageResult<()>;
    async fn delete(&self, id: TaskId) -> StorageResult<()>;
}
