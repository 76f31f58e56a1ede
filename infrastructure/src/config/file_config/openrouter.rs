//! OpenRouter connection from TOML (`[openrouter]`, `[openrouter.retry]`,
//! `[openrouter.circuit_breaker]`)

use crate::openrouter::{
    BreakerSettings, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, OpenRouterSettings, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw OpenRouter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOpenRouterConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub referer: Option<String>,
    pub app_title: Option<String>,
    pub retry: FileRetryConfig,
    pub circuit_breaker: FileCircuitBreakerConfig,
}

impl Default for FileOpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 120,
            temperature: 0.7,
            max_tokens: 4096,
            referer: None,
            app_title: Some("LLM Council".to_string()),
            retry: FileRetryConfig::default(),
            circuit_breaker: FileCircuitBreakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_seconds: u64,
}

impl Default for FileCircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout_seconds: 60,
        }
    }
}

impl FileOpenRouterConfig {
    pub fn to_settings(&self) -> OpenRouterSettings {
        OpenRouterSettings {
            base_url: self.base_url.clone(),
            api_key_env: self.api_key_env.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            referer: self.referer.clone(),
            app_title: self.app_title.clone(),
            retry: RetryPolicy {
                max_retries: self.retry.max_retries,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                exponential_base: self.retry.exponential_base,
                jitter: self.retry.jitter,
            },
            breaker: BreakerSettings {
                failure_threshold: self.circuit_breaker.failure_threshold.max(1),
                success_threshold: self.circuit_breaker.success_threshold.max(1),
                reset_timeout: Duration::from_secs(self.circuit_breaker.reset_timeout_seconds),
            },
        }
    }

    /// Named timeouts, for validation messages
    pub fn timeout_fields(&self) -> [(&'static str, u64); 2] {
        [
            ("openrouter.connect_timeout_seconds", self.connect_timeout_seconds),
            ("openrouter.request_timeout_seconds", self.request_timeout_seconds),
        ]
    }
}
