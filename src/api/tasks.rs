//! API endpoints for tasks and their subtasks.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};

use crate::task::{Subtask, SubtaskId, SubtaskUpdate, Task, TaskId, TaskUpdate};

use super::routes::AppState;
use super::types::*;

/// Create the task API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task).delete(clear_tasks))
        .route("/:id", get(get_task).patch(update_task).delete(delete_task))
        .route("/:id/subtasks", post(add_subtask))
        .route("/:id/subtasks/generate", post(generate_subtasks))
        .route(
            "/:id/subtasks/:subtask_id",
            patch(update_subtask).delete(delete_subtask),
        )
}

/// GET /api/tasks
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.store.tasks().await)
}

/// POST /api/tasks
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    let task = state.store.add_task(&req.text).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// DELETE /api/tasks
async fn clear_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearTasksResponse>, (StatusCode, String)> {
    let removed = state.store.clear_tasks().await.map_err(store_error)?;
    Ok(Json(ClearTasksResponse { removed }))
}

/// GET /api/tasks/:id
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .store
        .get_task(&TaskId::from(id))
        .await
        .map_err(store_error)?;
    Ok(Json(task))
}

/// PATCH /api/tasks/:id - Change text and/or completion.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task_id = TaskId::from(id);
    state
        .store
        .update_task(&task_id, update)
        .await
        .map_err(store_error)?;
    let task = state.store.get_task(&task_id).await.map_err(store_error)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .delete_task(&TaskId::from(id))
        .await
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/:id/subtasks
async fn add_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateSubtaskRequest>,
) -> Result<(StatusCode, Json<Subtask>), (StatusCode, String)> {
    let subtask = state
        .store
        .add_subtask(&TaskId::from(id), &req.text)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

/// POST /api/tasks/:id/subtasks/generate
///
/// The body is optional. Without a description the task's own text is used.
async fn generate_subtasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<GenerateSubtasksRequest>>,
) -> Result<Json<GenerateSubtasksResponse>, (StatusCode, String)> {
    let task_id = TaskId::from(id);
    let description = match body.and_then(|Json(req)| req.description) {
        Some(description) => description,
        // A missing task falls through with an empty description; the store
        // reports NotFound before it validates the description.
        None => state
            .store
            .get_task(&task_id)
            .await
            .map(|task| task.text().to_string())
            .unwrap_or_default(),
    };

    let subtasks = state
        .store
        .generate_subtasks_for(&task_id, &description)
        .await
        .map_err(store_error)?;
    Ok(Json(GenerateSubtasksResponse { subtasks }))
}

/// PATCH /api/tasks/:id/subtasks/:subtask_id - Returns the parent task.
async fn update_subtask(
    State(state): State<Arc<AppState>>,
    Path((id, subtask_id)): Path<(String, String)>,
    Json(update): Json<SubtaskUpdate>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task_id = TaskId::from(id);
    state
        .store
        .update_subtask(&task_id, &SubtaskId::from(subtask_id), update)
        .await
        .map_err(store_error)?;
    let task = state.store.get_task(&task_id).await.map_err(store_error)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id/subtasks/:subtask_id
async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Path((id, subtask_id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .delete_subtask(&TaskId::from(id), &SubtaskId::from(subtask_id))
        .await
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
