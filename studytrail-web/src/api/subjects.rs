//! Subject CRUD handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use studytrail_common::db::models::{Chapter, Subject};
use studytrail_common::slug::generate_unique_slug;

use crate::api::session_middleware::CurrentUser;
use crate::db::chapters::list_for_subject;
use crate::db::subjects::{
    create_subject as insert_subject, delete_subject as remove_subject, list_subjects as query_subjects,
    load_subject, slug_exists, SubjectSummary,
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Subject with its chapters
#[derive(Debug, Serialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub chapters: Vec<Chapter>,
}

/// GET /api/subjects
pub async fn list_subjects(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<SubjectSummary>>> {
    Ok(Json(query_subjects(&state.db, &user.user_id).await?))
}

/// POST /api/subjects
pub async fn create_subject(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateSubjectRequest>,
) -> ApiResult<Json<Subject>> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let pool = state.db.clone();
    let user_id = user.user_id.clone();
    let slug = generate_unique_slug(&title, move |candidate| {
        let pool = pool.clone();
        let user_id = user_id.clone();
        async move { slug_exists(&pool, &user_id, &candidate).await }
    })
    .await?;

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let guid = insert_subject(&state.db, &user.user_id, &title, &slug, description).await?;

    let subject = load_subject(&state.db, &user.user_id, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("Subject vanished after insert".to_string()))?;

    tracing::info!(subject = %guid, slug = %slug, "Created subject");

    Ok(Json(subject))
}

/// GET /api/subjects/:subject_id
pub async fn get_subject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(subject_id): Path<String>,
) -> ApiResult<Json<SubjectDetail>> {
    let subject = load_subject(&state.db, &user.user_id, &subject_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    let chapters = list_for_subject(&state.db, &subject.guid).await?;

    Ok(Json(SubjectDetail { subject, chapters }))
}

/// DELETE /api/subjects/:subject_id
pub async fn delete_subject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(subject_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    if !remove_subject(&state.db, &user.user_id, &subject_id).await? {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    tracing::info!(subject = %subject_id, "Deleted subject");

    Ok(Json(json!({ "success": true })))
}
