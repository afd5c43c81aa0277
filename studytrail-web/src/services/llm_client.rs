//! Chat-completions client (OpenRouter-compatible API)
//!
//! Single-purpose client: send one user prompt, get the generated text back.
//! Requests are rate limited to a configurable minimum interval and upstream
//! failures are mapped to typed errors so handlers can pick status codes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const REFERER: &str = "http://localhost:5730";
const TITLE: &str = "studytrail";

/// LLM client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key is not configured (set {})", API_KEY_ENV)]
    NotConfigured,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API rate limit reached, try again later")]
    RateLimited,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("AI returned empty response")]
    EmptyResponse,
}

/// Tunables loaded from the settings table at startup
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout_ms: u64,
    pub rate_limit_ms: u64,
}

impl LlmConfig {
    /// Load from settings, falling back to the seeded defaults
    pub async fn load(pool: &sqlx::SqlitePool) -> studytrail_common::Result<Self> {
        use studytrail_common::db::init::get_setting_or;

        let max_tokens = get_setting_or(pool, "ai_max_tokens", "2000")
            .await?
            .parse()
            .unwrap_or(2000);
        let request_timeout_ms = get_setting_or(pool, "ai_request_timeout_ms", "30000")
            .await?
            .parse()
            .unwrap_or(30_000);
        let rate_limit_ms = get_setting_or(pool, "ai_rate_limit_ms", "1000")
            .await?
            .parse()
            .unwrap_or(1000);

        Ok(Self {
            base_url: get_setting_or(
                pool,
                "ai_base_url",
                "https://openrouter.ai/api/v1/chat/completions",
            )
            .await?,
            model: get_setting_or(pool, "ai_model", "google/gemma-3-27b-it:free").await?,
            max_tokens,
            request_timeout_ms,
            rate_limit_ms,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Chat-completions API client
pub struct LlmClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: Option<String>,
    config: LlmConfig,
}

impl LlmClient {
    /// Build a client; a missing API key is reported at call time, not here,
    /// so the service still starts without one
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        if api_key.is_none() {
            tracing::warn!("{} is not set; AI endpoints will return errors", API_KEY_ENV);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(format!("studytrail/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let rate_limit_ms = config.rate_limit_ms;
        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit_ms)),
            api_key,
            config,
        })
    }

    /// Build from settings + environment
    pub async fn from_settings(pool: &sqlx::SqlitePool) -> studytrail_common::Result<Self> {
        let config = LlmConfig::load(pool).await?;
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());

        Self::new(config, api_key)
            .map_err(|e| studytrail_common::Error::Config(e.to_string()))
    }

    /// Generate text from a single user prompt
    pub async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        self.rate_limiter.wait().await;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(model = %self.config.model, "Querying chat completions API");

        let response = self
            .http_client
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(LlmError::InvalidApiKey);
        }

        if status == 429 {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            // Prefer the API's own message when it sends one
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(LlmError::ApiError(status.as_u16(), message));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }
}
