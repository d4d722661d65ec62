//! State of the create and edit modals.
//!
//! Each modal is either closed or open. Opening the edit modal on another task
//! while one is already open retargets it; nothing is queued.

use crate::domain::task::{NewTask, Task, TaskId, TaskValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveField {
    #[default]
    Title,
    Description,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub field: ActiveField,
}

impl TaskDraft {
    fn from_task(task: &Task) -> Self {
        Self { title: task.title.clone(), description: task.description.clone(), field: ActiveField::Title }
    }

    pub fn push(&mut self, c: char) { self.active_mut().push(c); }

    pub fn pop(&mut self) { self.active_mut().pop(); }

    pub fn switch_field(&mut self) {
        self.field = match self.field { ActiveField::Title => ActiveField::Description, ActiveField::Description => ActiveField::Title };
    }

    pub fn active_text(&self) -> &str {
        match self.field { ActiveField::Title => &self.title, ActiveField::Description => &self.description }
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field { ActiveField::Title => &mut self.title, ActiveField::Description => &mut self.description }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditModal {
    target: Task,
    pub draft: TaskDraft,
}

impl EditModal {
    pub fn target_id(&self) -> TaskId { self.target.id }
}

#[derive(Debug, Clone, Default)]
pub struct Modals {
    create: Option<TaskDraft>,
    edit: Option<EditModal>,
}

impl Modals {
    pub fn open_create(&mut self) {
        if self.create.is_none() { self.create = Some(TaskDraft::default()); }
    }

    pub fn open_edit(&mut self, task: &Task) {
        self.edit = Some(EditModal { target: task.clone(), draft: TaskDraft::from_task(task) });
    }

    pub fn dismiss_create(&mut self) { self.create = None; }

    pub fn dismiss_edit(&mut self) { self.edit = None; }

    pub fn create(&self) -> Option<&TaskDraft> { self.create.as_ref() }

    pub fn create_mut(&mut self) -> Option<&mut TaskDraft> { self.create.as_mut() }

    pub fn edit(&self) -> Option<&EditModal> { self.edit.as_ref() }

    pub fn edit_mut(&mut self) -> Option<&mut EditModal> { self.edit.as_mut() }

    pub fn is_open(&self) -> bool { self.create.is_some() || self.edit.is_some() }

    /// Closes the create modal and returns the task to insert. A draft that
    /// fails validation keeps the modal open.
    pub fn submit_create(&mut self) -> Option<Result<NewTask, TaskValidationError>> {
        let draft = self.create.as_ref()?;
        let result = NewTask::new(draft.title.trim(), draft.description.trim());
        if result.is_ok() { self.create = None; }
        Some(result)
    }

    /// Closes the edit modal and returns the target with title and description
    /// replaced. Identity and completion come from the target.
    pub fn submit_edit(&mut self) -> Option<Result<Task, TaskValidationError>> {
        let modal = self.edit.as_ref()?;
        let updated = Task {
            title: modal.draft.title.trim().to_string(),
            description: modal.draft.description.trim().to_string(),
            ..modal.target.clone()
        };
        if let Err(e) = updated.validate() { return Some(Err(e)); }
        self.edit = None;
        Some(Ok(updated))
    }
}
