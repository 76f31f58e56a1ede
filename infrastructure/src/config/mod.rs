//! Configuration file loading for llm-council
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `LLM_COUNCIL_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./council.toml` or `./.council.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/llm-council/config.toml`
//! 5. Default values
//!
//! CLI flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileCircuitBreakerConfig, FileConfig, FileCouncilConfig,
    FileDeliberationConfig, FileOpenRouterConfig, FileOutputConfig, FileRetryConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
