use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage-assigned identifier. Never reused once handed out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl Task {
    pub fn validate(&self) -> Result<(), TaskValidationError> { validate_title(&self.title) }

    /// Copy of this task with the completion flag flipped.
    pub fn toggled(&self) -> Task {
        Task { completed: !self.completed, ..self.clone() }
    }
}

/// A task that has not been persisted yet, so it has no identifier.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Result<Self, TaskValidationError> {
        let task = Self { title: title.into(), description: description.into(), completed: false };
        task.validate()?;
        Ok(task)
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> { validate_title(&self.title) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskValidationError {
    #[error("task title must not be empty")]
    EmptyTitle,
}

fn validate_title(title: &str) -> Result<(), TaskValidationError> {
    if title.trim().is_empty() { Err(TaskValidationError::EmptyTitle) } else { Ok(()) }
}
