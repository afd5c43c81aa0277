//! Task handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use studytrail_common::db::models::Task;

use crate::api::session_middleware::CurrentUser;
use crate::db::chapters::load_chapter;
use crate::db::tasks::{create_task as insert_task, delete_task as remove_task, load_task, toggle_task};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub chapter_id: String,
    pub description: String,
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let description = request.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest("Description is required".to_string()));
    }

    // Verify the chapter belongs to a subject owned by the caller
    load_chapter(&state.db, &user.user_id, &request.chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let guid = insert_task(&state.db, &request.chapter_id, &description).await?;

    let task = load_task(&state.db, &user.user_id, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("Task vanished after insert".to_string()))?;

    Ok(Json(task))
}

/// POST /api/tasks/:task_id/toggle
pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    load_task(&state.db, &user.user_id, &task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let is_completed = toggle_task(&state.db, &task_id).await?;

    Ok(Json(json!({
        "success": true,
        "is_completed": is_completed,
    })))
}

/// DELETE /api/tasks/:task_id
pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    load_task(&state.db, &user.user_id, &task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    remove_task(&state.db, &task_id).await?;

    Ok(Json(json!({ "success": true })))
}
