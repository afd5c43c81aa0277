//! AI-assisted content generation
//!
//! Each endpoint builds a prompt from the caller's own rows, calls the
//! chat-completions client, and persists the result back onto the owning
//! row. Parsing is best-effort with deterministic fallbacks (ai_text).

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use studytrail_common::db::init::get_setting_or;

use crate::api::session_middleware::CurrentUser;
use crate::db::chapters::{list_for_subject, load_chapter, set_intuition, set_transitions};
use crate::db::resources::list_for_chapter as list_resources;
use crate::db::subjects::{load_subject, needs_regeneration, set_overview};
use crate::db::tasks::create_tasks;
use crate::error::{ApiError, ApiResult};
use crate::services::ai_text;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct IntuitionRequest {
    pub chapter_id: String,
    pub context_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTasksRequest {
    pub chapter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubjectOverviewRequest {
    pub subject_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubjectOverviewQuery {
    pub subject_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionsQuery {
    pub chapter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionsRequest {
    pub chapter_id: String,
    pub tasks: Vec<String>,
    #[serde(default)]
    pub force_regenerate: bool,
}

/// POST /api/ai/intuition
pub async fn generate_intuition(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<IntuitionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let loaded = load_chapter(&state.db, &user.user_id, &request.chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let resources = list_resources(&state.db, &loaded.chapter.guid).await?;

    // Build rich context: subject, chapter, resource titles, caller text
    let mut context = format!(
        "Subject: {}\nChapter: {}",
        loaded.subject_title, loaded.chapter.title
    );
    if !resources.is_empty() {
        let titles: Vec<&str> = resources.iter().map(|r| r.title.as_str()).collect();
        context.push_str(&format!("\nResources: {}", titles.join(", ")));
    }
    if let Some(text) = &request.context_text {
        let cap: usize = get_setting_or(&state.db, "ai_context_max_chars", "5000")
            .await?
            .parse()
            .unwrap_or(5000);
        context.push_str(&format!(
            "\n\nAdditional Context:\n{}",
            ai_text::truncate_context(text, cap)
        ));
    }

    let intuition = state
        .llm
        .generate_text(&ai_text::intuition_prompt(&context))
        .await?;

    set_intuition(&state.db, &loaded.chapter.guid, &intuition).await?;

    Ok(Json(json!({ "intuition": intuition, "success": true })))
}

/// POST /api/ai/tasks
pub async fn generate_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<GenerateTasksRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let loaded = load_chapter(&state.db, &user.user_id, &request.chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let resources = list_resources(&state.db, &loaded.chapter.guid).await?;

    let mut context = format!(
        "Subject: {}\nChapter: {}",
        loaded.subject_title, loaded.chapter.title
    );
    if let Some(intuition) = &loaded.chapter.intuition {
        context.push_str(&format!("\n\nChapter Intuition/Summary:\n{}", intuition));
    }
    if !resources.is_empty() {
        let titles: Vec<&str> = resources.iter().map(|r| r.title.as_str()).collect();
        context.push_str(&format!("\n\nAvailable Resources: {}", titles.join(", ")));
    }

    let text = state
        .llm
        .generate_text(&ai_text::tasks_prompt(&context))
        .await?;

    let cap: usize = get_setting_or(&state.db, "ai_generated_tasks_max", "7")
        .await?
        .parse()
        .unwrap_or(7);
    let tasks = ai_text::parse_task_list(&text, cap);

    if !tasks.is_empty() {
        create_tasks(&state.db, &loaded.chapter.guid, &tasks).await?;
    }

    Ok(Json(json!({
        "success": true,
        "tasks": tasks,
        "count": tasks.len(),
    })))
}

/// POST /api/ai/subject-overview
pub async fn generate_subject_overview(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SubjectOverviewRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = load_subject(&state.db, &user.user_id, &request.subject_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    let chapters = list_for_subject(&state.db, &subject.guid).await?;
    let chapter_titles: Vec<String> = chapters.iter().map(|c| c.title.clone()).collect();

    let prompt = ai_text::overview_prompt(
        &subject.title,
        subject.description.as_deref(),
        &chapter_titles,
    );

    // Degrade to a deterministic overview if generation fails
    let overview = match state.llm.generate_text(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Overview generation failed: {}", e);
            ai_text::fallback_overview(
                &subject.title,
                subject.description.as_deref(),
                chapters.len(),
            )
        }
    };

    set_overview(&state.db, &subject.guid, &overview).await?;

    Ok(Json(json!({ "overview": overview })))
}

/// GET /api/ai/subject-overview?subject_id=
pub async fn get_subject_overview(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SubjectOverviewQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = load_subject(&state.db, &user.user_id, &query.subject_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    Ok(Json(json!({
        "overview": subject.overview,
        "generated_at": subject.overview_generated_at,
        "needs_regeneration": needs_regeneration(&subject),
    })))
}

/// GET /api/ai/transitions?chapter_id=
pub async fn get_transitions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TransitionsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let loaded = load_chapter(&state.db, &user.user_id, &query.chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let saved = loaded.chapter.task_flow_transitions.is_some();
    let transitions =
        ai_text::parse_stored_transitions(loaded.chapter.task_flow_transitions.as_deref());

    Ok(Json(json!({ "transitions": transitions, "saved": saved })))
}

/// POST /api/ai/transitions
pub async fn generate_transitions(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<TransitionsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.tasks.len() < 2 {
        return Err(ApiError::BadRequest("Need at least 2 tasks".to_string()));
    }

    let loaded = load_chapter(&state.db, &user.user_id, &request.chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    // Serve the cached set unless the caller forces regeneration
    if !request.force_regenerate {
        if let Some(stored) = loaded.chapter.task_flow_transitions.as_deref() {
            let transitions = ai_text::parse_stored_transitions(Some(stored));
            if !transitions.is_empty() {
                return Ok(Json(json!({ "transitions": transitions, "cached": true })));
            }
        }
    }

    let prompt = ai_text::transitions_prompt(
        &loaded.chapter.title,
        &loaded.subject_title,
        &request.tasks,
    );

    let text = state.llm.generate_text(&prompt).await?;
    let transitions = ai_text::parse_transitions(&text, &request.tasks);

    let serialized = serde_json::to_string(&transitions)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize transitions: {}", e)))?;
    set_transitions(&state.db, &loaded.chapter.guid, &serialized).await?;

    Ok(Json(json!({ "transitions": transitions, "cached": false })))
}
