use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{application::task_service::AppError, domain::repository::StorageError, domain::task::Task};

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub message: String,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match &err {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub items: Vec<Task>,
}

/// Body of `PUT /tasks/:id`: every field is replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub title: String,
    pub description: String,
    pub completed: bool,
}
