//! Presentation layer for llm-council
//!
//! This crate contains the CLI definition, output formatters and
//! progress reporters that render the deliberation event stream.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputArg, VotingArg};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SilentProgress, SimpleProgress};
