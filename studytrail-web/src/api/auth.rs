//! Registration, login, logout, and the current-user endpoint

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use studytrail_common::auth::{generate_salt, hash_password, verify_password};

use crate::api::session_middleware::{
    clear_cookie_header, session_cookie_header, CurrentUser,
};
use crate::db::sessions::{create_session, delete_session, session_timeout_seconds};
use crate::db::users::{create_user, email_exists, load_user, load_user_by_email};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = request.email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if email_exists(&state.db, &email).await? {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let salt = generate_salt();
    let hash = hash_password(&request.password, &salt);

    let user_id = create_user(
        &state.db,
        &email,
        request.display_name.as_deref(),
        &hash,
        &salt,
    )
    .await?;

    tracing::info!(user_id = %user_id, "Registered new user");

    start_session(&state, &user_id).await
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = request.email.trim().to_lowercase();

    let user = load_user_by_email(&state.db, &email)
        .await?
        .filter(|u| verify_password(&request.password, &u.password_salt, &u.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    start_session(&state, &user.guid).await
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    delete_session(&state.db, &user.token).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, clear_cookie_header())]),
        Json(json!({ "success": true })),
    ))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<serde_json::Value>> {
    let record = load_user(&state.db, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User no longer exists".to_string()))?;

    Ok(Json(json!({ "user": record.public() })))
}

/// Create a session for the user and attach the cookie
async fn start_session(state: &AppState, user_id: &str) -> ApiResult<impl IntoResponse> {
    let timeout = session_timeout_seconds(&state.db).await?;
    let token = create_session(&state.db, user_id, timeout).await?;

    let record = load_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("User vanished during login".to_string()))?;

    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie_header(&token, timeout))]),
        Json(json!({ "user": record.public() })),
    ))
}
