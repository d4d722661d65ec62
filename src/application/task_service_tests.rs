#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    use super::super::task_service::{AppError, TaskService, TaskServiceImpl};
    use crate::domain::{
        repository::{StorageError, StorageResult, TaskRepository},
        task::{NewTask, Task, TaskId, TaskValidationError},
    };
    use async_trait::async_trait;

    #[derive(Clone, Default)]
    struct InMemoryRepo {
        items: Arc<Mutex<Vec<Task>>>,
        next_id: Arc<AtomicI64>,
        fail_writes: Arc<AtomicBool>,
        fail_reads: Arc<AtomicBool>,
    }

    impl InMemoryRepo {
        fn check_writable(&self) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::OperationFailed("disk full".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TaskRepository for InMemoryRepo {
        async fn init(&self) -> StorageResult<()> { Ok(()) }
        async fn list_all(&self) -> StorageResult<Vec<Task>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::OperationFailed("read error".into()));
            }
            let mut items = self.items.lock().unwrap().clone();
            items.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(items)
        }
        async fn insert(&self, task: &NewTask) -> StorageResult<()> {
            self.check_writable()?;
            let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            self.items.lock().unwrap().push(Task {
                id,
                title: task.title.clone(),
                description: task.description.clone(),
                completed: task.completed,
            });
            Ok(())
        }
        async fn update(&self, task: &Task) -> StorageResult<()> {
            self.check_writable()?;
            let mut items = self.items.lock().unwrap();
            let Some(slot) = items.iter_mut().find(|t| t.id == task.id) else { return Err(StorageError::NotFound(task.id)) };
            *slot = task.clone();
            Ok(())
        }
        async fn delete(&self, id: TaskId) -> StorageResult<()> {
            self.check_writable()?;
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|t| t.id != id);
            if items.len() == before { return Err(StorageError::NotFound(id)); }
            Ok(())
        }
    }

    fn new_task(title: &str) -> NewTask { NewTask::new(title, "").unwrap() }

    #[tokio::test]
    async fn unit_add_refreshes_held_list() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        assert!(service.tasks().is_empty());
        let tasks = service.add_task(NewTask::new("Buy milk", "2%").unwrap()).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, TaskId(1));
        assert_eq!(service.tasks(), tasks);
    }

    #[tokio::test]
    async fn unit_subscribers_see_each_mutation() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        let mut rx = service.subscribe();
        service.add_task(new_task("a")).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
        service.delete_task(TaskId(1)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn unit_toggle_flips_only_completion() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        service.add_task(NewTask::new("Walk dog", "park").unwrap()).await.unwrap();
        let tasks = service.toggle_complete(TaskId(1)).await.unwrap();
        assert_eq!(tasks[0], Task { id: TaskId(1), title: "Walk dog".into(), description: "park".into(), completed: true });
    }

    #[tokio::test]
    async fn unit_failed_write_leaves_state_unchanged() {
        let repo = InMemoryRepo::default();
        let service = TaskServiceImpl::new(repo.clone());
        service.add_task(new_task("keep me")).await.unwrap();
        let before = service.tasks();

        repo.fail_writes.store(true, Ordering::SeqCst);
        let err = service.add_task(new_task("lost")).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::OperationFailed(_))));
        assert_eq!(service.tasks(), before);
    }

    #[tokio::test]
    async fn unit_failed_reread_after_write_leaves_state_unchanged() {
        let repo = InMemoryRepo::default();
        let service = TaskServiceImpl::new(repo.clone());
        service.add_task(new_task("before")).await.unwrap();
        let before = service.tasks();
        let mut rx = service.subscribe();

        repo.fail_reads.store(true, Ordering::SeqCst);
        let err = service.add_task(new_task("written")).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::OperationFailed(_))));
        assert_eq!(service.tasks(), before);
        assert!(!rx.has_changed().unwrap());

        // The write itself landed; the next successful refresh shows it.
        repo.fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(service.refresh().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unit_toggle_reads_stored_row_not_held_copy() {
        let repo = InMemoryRepo::default();
        let service = TaskServiceImpl::new(repo.clone());
        service.add_task(new_task("shared")).await.unwrap();
        // Another writer completes the task behind the held list's back.
        let stored = repo.list_all().await.unwrap()[0].toggled();
        repo.update(&stored).await.unwrap();

        let tasks = service.toggle_complete(TaskId(1)).await.unwrap();
        assert!(!tasks[0].completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unit_overlapping_toggles_cancel_out() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        service.add_task(new_task("flip")).await.unwrap();
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.toggle_complete(TaskId(1)).await })
            })
            .collect();
        for handle in handles { handle.await.unwrap().unwrap(); }
        assert!(!service.refresh().await.unwrap()[0].completed);
    }

    #[tokio::test]
    async fn unit_validation_happens_before_storage() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        service.add_task(new_task("x")).await.unwrap();
        let bad = Task { id: TaskId(1), title: " ".into(), description: String::new(), completed: false };
        let err = service.update_task(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(TaskValidationError::EmptyTitle)));
        assert_eq!(service.tasks()[0].title, "x");
    }

    #[tokio::test]
    async fn unit_missing_identifier_is_not_found() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        let err = service.delete_task(TaskId(42)).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::NotFound(TaskId(42)))));
        let err = service.toggle_complete(TaskId(42)).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::NotFound(TaskId(42)))));
    }

    #[tokio::test]
    async fn unit_load_picks_up_existing_rows() {
        let repo = InMemoryRepo::default();
        repo.insert(&new_task("first")).await.unwrap();
        repo.insert(&new_task("second")).await.unwrap();
        let service = TaskServiceImpl::load(repo).await.unwrap();
        let titles: Vec<_> = service.tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[tokio::test]
    async fn unit_concurrent_intents_all_land() {
        let service = TaskServiceImpl::new(InMemoryRepo::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.add_task(new_task(&format!("t{i}"))).await })
            })
            .collect();
        for handle in handles { handle.await.unwrap().unwrap(); }
        assert_eq!(service.tasks().len(), 8);
        assert_eq!(service.refresh().await.unwrap().len(), 8);
    }
}
