//! Check-ins, study sessions, streaks, and progress stats

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::api::session_middleware::CurrentUser;
use crate::db::chapters::load_chapter;
use crate::db::study::{check_in, load_streak, progress_stats, record_study_session, ProgressStats};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StudySessionRequest {
    pub chapter_id: String,
    /// Minutes studied
    pub duration: i64,
}

/// POST /api/study/checkin
pub async fn checkin(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<serde_json::Value>> {
    let today = Utc::now().date_naive();
    let outcome = check_in(&state.db, &user.user_id, today).await?;

    Ok(Json(json!({ "message": outcome.message() })))
}

/// POST /api/study/session
///
/// Records the timed session, then applies the same streak advance as a
/// check-in.
pub async fn record_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<StudySessionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.duration <= 0 {
        return Err(ApiError::BadRequest(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }

    // Verify chapter belongs to the caller
    load_chapter(&state.db, &user.user_id, &request.chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    let guid = record_study_session(
        &state.db,
        &user.user_id,
        Some(&request.chapter_id),
        request.duration,
    )
    .await?;

    let today = Utc::now().date_naive();
    let outcome = check_in(&state.db, &user.user_id, today).await?;

    tracing::info!(
        session = %guid,
        minutes = request.duration,
        streak = ?outcome.new_streak(),
        "Recorded study session"
    );

    Ok(Json(json!({
        "success": true,
        "session": {
            "guid": guid,
            "duration_minutes": request.duration,
        },
        "streak": outcome.message(),
    })))
}

/// GET /api/study/streak
pub async fn streak(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<serde_json::Value>> {
    let streak = load_streak(&state.db, &user.user_id).await?;

    Ok(Json(json!({
        "current_streak": streak.as_ref().map(|s| s.current_streak).unwrap_or(0),
        "last_study_date": streak.and_then(|s| s.last_study_date),
    })))
}

/// GET /api/study/progress
pub async fn progress(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<ProgressStats>> {
    Ok(Json(progress_stats(&state.db, &user.user_id).await?))
}
