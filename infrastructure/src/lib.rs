//! Infrastructure layer for llm-council
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the OpenRouter model invoker, configuration
//! file loading and the JSONL transcript logger.

pub mod config;
pub mod logging;
pub mod openrouter;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileCouncilConfig, FileDeliberationConfig,
    FileOpenRouterConfig, FileOutputConfig,
};
pub use logging::JsonlConversationLogger;
pub use openrouter::{OpenRouterError, OpenRouterInvoker, OpenRouterSettings};
