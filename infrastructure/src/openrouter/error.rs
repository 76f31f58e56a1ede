//! OpenRouter errors and their mapping onto [`FailureKind`]

use council_application::InvocationFailure;
use council_domain::FailureKind;
use std::time::Duration;
use thiserror::Error;

/// `Retry-After` assumed when a 429 carries none
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum OpenRouterError {
    #[error("API key not found: set {env}")]
    MissingApiKey { env: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Circuit open for {model}, retry in {}s", .remaining.as_secs())]
    CircuitOpen { model: String, remaining: Duration },
}

impl OpenRouterError {
    /// Build a status error; 429s always carry a retry delay
    pub fn status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let retry_after = match status {
            429 => Some(retry_after.unwrap_or(DEFAULT_RETRY_AFTER)),
            _ => retry_after,
        };
        OpenRouterError::Status {
            status,
            message: message.into(),
            retry_after,
        }
    }

    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OpenRouterError::Timeout
        } else if error.is_decode() {
            OpenRouterError::InvalidResponse(error.to_string())
        } else {
            OpenRouterError::Network(error.to_string())
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            OpenRouterError::MissingApiKey { .. } => FailureKind::AuthError,
            OpenRouterError::Status { status, .. } => match status {
                401 | 403 => FailureKind::AuthError,
                429 => FailureKind::RateLimited,
                408 | 500..=599 => FailureKind::TransportError,
                _ => FailureKind::InvalidResponse,
            },
            OpenRouterError::Timeout => FailureKind::Timeout,
            OpenRouterError::Client(_)
            | OpenRouterError::Network(_)
            | OpenRouterError::CircuitOpen { .. } => FailureKind::TransportError,
            OpenRouterError::InvalidResponse(_) => FailureKind::InvalidResponse,
        }
    }

    /// Whether the same request may be sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenRouterError::Status { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            OpenRouterError::Network(_) => true,
            _ => false,
        }
    }

    /// Whether this failure counts against the model's circuit
    ///
    /// Client-side mistakes (bad request, bad key) say nothing about the
    /// model's health.
    pub fn trips_breaker(&self) -> bool {
        match self {
            OpenRouterError::Status { status, .. } => *status == 429 || *status >= 500,
            OpenRouterError::Timeout | OpenRouterError::Network(_) => true,
            OpenRouterError::InvalidResponse(_) => true,
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            OpenRouterError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<OpenRouterError> for InvocationFailure {
    fn from(error: OpenRouterError) -> Self {
        InvocationFailure::new(error.kind(), error.to_string())
    }
}

/// Parse a `Retry-After` header, either delay-seconds or an HTTP date
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
