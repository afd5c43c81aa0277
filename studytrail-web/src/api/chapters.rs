//! Chapter handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use studytrail_common::db::models::{Chapter, Resource, Task};
use studytrail_common::slug::generate_unique_slug;

use crate::api::session_middleware::CurrentUser;
use crate::db::chapters::{
    create_chapter as insert_chapter, delete_chapter as remove_chapter, load_chapter, slug_exists,
    toggle_completed,
};
use crate::db::resources::list_for_chapter as list_resources;
use crate::db::subjects::{load_subject, touch_subject};
use crate::db::tasks::list_for_chapter as list_tasks;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChapterRequest {
    pub subject_id: String,
    pub title: String,
}

/// Chapter with its tasks and resources
#[derive(Debug, Serialize)]
pub struct ChapterDetail {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub subject_title: String,
    pub tasks: Vec<Task>,
    pub resources: Vec<Resource>,
}

/// POST /api/chapters
pub async fn create_chapter(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateChapterRequest>,
) -> ApiResult<Json<Chapter>> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    // Ownership check before touching anything
    let subject = load_subject(&state.db, &user.user_id, &request.subject_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    let pool = state.db.clone();
    let subject_id = subject.guid.clone();
    let slug = generate_unique_slug(&title, move |candidate| {
        let pool = pool.clone();
        let subject_id = subject_id.clone();
        async move { slug_exists(&pool, &subject_id, &candidate).await }
    })
    .await?;

    let guid = insert_chapter(&state.db, &subject.guid, &title, &slug).await?;
    touch_subject(&state.db, &subject.guid).await?;

    let chapter = load_chapter(&state.db, &user.user_id, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("Chapter vanished after insert".to_string()))?;

    tracing::info!(chapter = %guid, subject = %subject.guid, "Created chapter");

    Ok(Json(chapter.chapter))
}

/// GET /api/chapters/:chapter_id
pub async fn get_chapter(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chapter_id): Path<String>,
) -> ApiResult<Json<ChapterDetail>> {
    let loaded = load_chapter(&state.db, &user.user_id, &chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let tasks = list_tasks(&state.db, &loaded.chapter.guid).await?;
    let resources = list_resources(&state.db, &loaded.chapter.guid).await?;

    Ok(Json(ChapterDetail {
        chapter: loaded.chapter,
        subject_title: loaded.subject_title,
        tasks,
        resources,
    }))
}

/// DELETE /api/chapters/:chapter_id
pub async fn delete_chapter(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chapter_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let loaded = load_chapter(&state.db, &user.user_id, &chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    // Cascades to tasks and resources
    remove_chapter(&state.db, &user.user_id, &chapter_id).await?;
    touch_subject(&state.db, &loaded.chapter.subject_id).await?;

    tracing::info!(chapter = %chapter_id, "Deleted chapter");

    Ok(Json(json!({
        "success": true,
        "message": "Chapter deleted",
        "subject_id": loaded.chapter.subject_id,
    })))
}

/// POST /api/chapters/:chapter_id/complete
pub async fn toggle_complete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chapter_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    load_chapter(&state.db, &user.user_id, &chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let is_completed = toggle_completed(&state.db, &chapter_id).await?;

    Ok(Json(json!({
        "success": true,
        "is_completed": is_completed,
    })))
}
