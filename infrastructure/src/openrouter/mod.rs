//! OpenRouter model invoker
//!
//! Adapter for the [`ModelInvoker`](council_application::ModelInvoker) port
//! backed by OpenRouter's OpenAI-compatible Chat Completions API.

mod circuit_breaker;
mod client;
mod error;
mod retry;
mod settings;
mod types;

pub use circuit_breaker::{BreakerSettings, CircuitBreaker, CircuitState};
pub use client::OpenRouterInvoker;
pub use error::{DEFAULT_RETRY_AFTER, OpenRouterError, parse_retry_after};
pub use retry::RetryPolicy;
pub use settings::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, OpenRouterSettings};
