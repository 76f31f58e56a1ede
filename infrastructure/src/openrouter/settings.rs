//! OpenRouter connection settings

use super::circuit_breaker::BreakerSettings;
use super::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Everything the [`OpenRouterInvoker`](super::OpenRouterInvoker) needs besides the key
#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub connect_timeout: Duration,
    /// Whole-request limit for a single attempt
    pub request_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Sent as `HTTP-Referer`
    pub referer: Option<String>,
    /// Sent as `X-Title`
    pub app_title: Option<String>,
    pub retry: RetryPolicy,
    pub breaker: BreakerSettings,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            temperature: 0.7,
            max_tokens: 4096,
            referer: None,
            app_title: Some("LLM Council".to_string()),
            retry: RetryPolicy::default(),
            breaker: BreakerSettings::default(),
        }
    }
}

impl OpenRouterSettings {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: BreakerSettings) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `{base_url}/chat/completions`, tolerating a trailing slash
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
