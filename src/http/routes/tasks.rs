use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{post, put},
    Json, Router,
};
use axum::http::StatusCode;

use crate::{
    application::task_service::{TaskService, TaskSnapshot},
    domain::task::{NewTask, Task, TaskId},
    http::types::{ApiError, TaskList, UpdateBody},
};

#[derive(Clone)]
pub struct AppState<S: TaskService> { pub service: S }

pub fn router<S: TaskService + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/tasks", post(add_task::<S>).get(list_tasks::<S>))
        .route("/tasks/:id", put(update_task::<S>).delete(delete_task::<S>))
        .route("/tasks/:id/toggle", post(toggle_task::<S>))
        .with_state(state)
}

fn to_list(snapshot: TaskSnapshot) -> Json<TaskList> { Json(TaskList { items: snapshot.as_ref().clone() }) }

async fn list_tasks<S: TaskService>(State(state): State<AppState<S>>) -> Result<Json<TaskList>, ApiError> {
    Ok(to_list(state.service.refresh().await?))
}

async fn add_task<S: TaskService>(State(state): State<AppState<S>>, Json(payload): Json<NewTask>) -> Result<(StatusCode, Json<TaskList>), ApiError> {
    let tasks = state.service.add_task(payload).await?;
    Ok((StatusCode::CREATED, to_list(tasks)))
}

async fn update_task<S: TaskService>(State(state): State<AppState<S>>, id: Result<Path<i64>, PathRejection>, Json(payload): Json<UpdateBody>) -> Result<Json<TaskList>, ApiError> {
    let task = Task { id: parse_id(id)?, title: payload.title, description: payload.description, completed: payload.completed };
    Ok(to_list(state.service.update_task(task).await?))
}

async fn toggle_task<S: TaskService>(State(state): State<AppState<S>>, id: Result<Path<i64>, PathRejection>) -> Result<Json<TaskList>, ApiError> {
    Ok(to_list(state.service.toggle_complete(parse_id(id)?).await?))
}

async fn delete_task<S: TaskService>(State(state): State<AppState<S>>, id: Result<Path<i64>, PathRejection>) -> Result<StatusCode, ApiError> {
    state.service.delete_task(parse_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(path: Result<Path<i64>, PathRejection>) -> Result<TaskId, ApiError> {
    path.map(|Path(id)| TaskId(id))
        .map_err(|rejection| ApiError { status: StatusCode::BAD_REQUEST, message: format!("invalid id: {}", rejection.body_text()) })
}
