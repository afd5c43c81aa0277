//! API error type and HTTP response mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid session, or wrong credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested row does not exist or is not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request payload failed validation
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Uniqueness violation (e.g. registering an existing email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream AI service failure
    #[error("AI service error: {0}")]
    Upstream(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("API error: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<studytrail_common::Error> for ApiError {
    fn from(err: studytrail_common::Error) -> Self {
        use studytrail_common::Error;

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Database(e) => ApiError::Internal(format!("Database error: {}", e)),
            Error::Io(e) => ApiError::Internal(format!("IO error: {}", e)),
            Error::Config(msg) => ApiError::Internal(format!("Configuration error: {}", msg)),
            Error::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<crate::services::llm_client::LlmError> for ApiError {
    fn from(err: crate::services::llm_client::LlmError) -> Self {
        use crate::services::llm_client::LlmError;

        match err {
            LlmError::NotConfigured => ApiError::Internal(err.to_string()),
            LlmError::InvalidApiKey
            | LlmError::RateLimited
            | LlmError::NetworkError(_)
            | LlmError::ApiError(_, _)
            | LlmError::ParseError(_)
            | LlmError::EmptyResponse => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}
