use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use crate::domain::{
    repository::{StorageError, TaskRepository},
    task::{NewTask, Task, TaskId, TaskValidationError},
};

/// Immutable view of the whole task list, most recent first.
pub type TaskSnapshot = Arc<Vec<Task>>;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Intents the presentation layer may raise, plus read access to the list.
#[async_trait]
pub trait TaskService: Send + Sync + 'static {
    fn tasks(&self) -> TaskSnapshot;
    fn subscribe(&self) -> watch::Receiver<TaskSnapshot>;
    async fn refresh(&self) -> AppResult<TaskSnapshot>;
    async fn add_task(&self, input: NewTask) -> AppResult<TaskSnapshot>;
    async fn update_task(&self, task: Task) -> AppResult<TaskSnapshot>;
    async fn toggle_complete(&self, id: TaskId) -> AppResult<TaskSnapshot>;
    async fn delete_task(&self, id: TaskId) -> AppResult<TaskSnapshot>;
}

/// Holds the current task list and re-reads it from storage after every mutation.
///
/// The held list is a disposable copy: it is replaced wholesale on each
/// successful refresh and left untouched when an operation fails.
pub struct TaskServiceImpl<R: TaskRepository> {
    repo: Arc<R>,
    state: Arc<watch::Sender<TaskSnapshot>>,
    writes: Arc<Mutex<()>>,
}

impl<R: TaskRepository> Clone for TaskServiceImpl<R> {
    fn clone(&self) -> Self {
        Self { repo: self.repo.clone(), state: self.state.clone(), writes: self.writes.clone() }
    }
}

impl<R: TaskRepository> TaskServiceImpl<R> {
    /// Starts with an empty list; call [`TaskService::refresh`] or use [`Self::load`].
    pub fn new(repo: R) -> Self {
        let (state, _) = watch::channel(Arc::new(Vec::new()));
        Self { repo: Arc::new(repo), state: Arc::new(state), writes: Arc::new(Mutex::new(())) }
    }

    pub async fn load(repo: R) -> AppResult<Self> {
        let service = Self::new(repo);
        service.refresh().await?;
        Ok(service)
    }

    async fn reload(&self) -> AppResult<TaskSnapshot> {
        let tasks: TaskSnapshot = Arc::new(self.repo.list_all().await?);
        self.state.send_replace(tasks.clone());
        tracing::debug!(count = tasks.len(), "task list refreshed");
        Ok(tasks)
    }

    /// Writes `task` and re-reads. Callers must hold `writes`.
    async fn apply_update(&self, task: &Task) -> AppResult<TaskSnapshot> {
        self.repo
            .update(task)
            .await
            .inspect_err(|e| tracing::warn!(task_id = %task.id, error = %e, "update failed"))?;
        tracing::info!(task_id = %task.id, completed = task.completed, "task updated");
        self.reload().await
    }
}

#[async_trait]
impl<R: TaskRepository> TaskService for TaskServiceImpl<R> {
    fn tasks(&self) -> TaskSnapshot { self.state.borrow().clone() }

    fn subscribe(&self) -> watch::Receiver<TaskSnapshot> { self.state.subscribe() }

    async fn refresh(&self) -> AppResult<TaskSnapshot> {
        let _guard = self.writes.lock().await;
        self.reload().await
    }

    async fn add_task(&self, input: NewTask) -> AppResult<TaskSnapshot> {
        input.validate()?;
        let _guard = self.writes.lock().await;
        self.repo.insert(&input).await.inspect_err(|e| tracing::warn!(error = %e, "insert failed"))?;
        tracing::info!(title = %input.title, "task added");
        self.reload().await
    }

    async fn update_task(&self, task: Task) -> AppResult<TaskSnapshot> {
        task.validate()?;
        let _guard = self.writes.lock().await;
        self.apply_update(&task).await
    }

    /// Flips completion based on the stored row, read under the write lock so
    /// overlapping toggles of one task never both see the same starting value.
    async fn toggle_complete(&self, id: TaskId) -> AppResult<TaskSnapshot> {
        let _guard = self.writes.lock().await;
        let current = self.repo.list_all().await?.into_iter().find(|t| t.id == id);
        let Some(task) = current else { return Err(StorageError::NotFound(id).into()) };
        self.apply_update(&task.toggled()).await
    }

    async fn delete_task(&self, id: TaskId) -> AppResult<TaskSnapshot> {
        let _guard = self.writes.lock().await;
        self.repo.delete(id).await.inspect_err(|e| tracing::warn!(task_id = %id, error = %e, "delete failed"))?;
        tracing::info!(task_id = %id, "task deleted");
        self.reload().await
    }
}
