//! Session-cookie authentication middleware
//!
//! Tower layer wrapping the protected route tree. Resolves the session
//! cookie against the sessions table and injects [`CurrentUser`] into
//! request extensions; handlers take it via the extractor below.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::db::sessions::load_session_user;
use crate::error::ApiError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "studytrail_session";

/// The authenticated caller, available to every protected handler
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    /// Session token, needed again at logout
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("No session".to_string()))
    }
}

/// Tower layer performing session validation
#[derive(Clone)]
pub struct SessionLayer {
    pub pool: SqlitePool,
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            pool: self.pool.clone(),
        }
    }
}

/// Tower service that resolves the session cookie
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    pool: SqlitePool,
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let pool = self.pool.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(token) = session_cookie(request.headers()) else {
                return Ok(
                    ApiError::Unauthorized("Missing session cookie".to_string()).into_response()
                );
            };

            match load_session_user(&pool, &token).await {
                Ok(Some(user)) => {
                    request.extensions_mut().insert(CurrentUser {
                        user_id: user.user_id,
                        email: user.email,
                        is_admin: user.is_admin,
                        token,
                    });
                    inner.call(request).await
                }
                Ok(None) => Ok(ApiError::Unauthorized(
                    "Invalid or expired session".to_string(),
                )
                .into_response()),
                Err(e) => {
                    tracing::error!("Session lookup failed: {}", e);
                    Ok(
                        ApiError::Internal("Failed to validate session".to_string())
                            .into_response(),
                    )
                }
            }
        })
    }
}

/// Extract the session token from the Cookie header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Build a Set-Cookie value establishing the session
pub fn session_cookie_header(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    )
}

/// Build a Set-Cookie value clearing the session
pub fn clear_cookie_header() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; studytrail_session=abc123; lang=en"),
        );

        assert_eq!(session_cookie(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("studytrail_session="),
        );
        assert_eq!(session_cookie(&headers), None);
    }
}
