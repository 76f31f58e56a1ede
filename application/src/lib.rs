//! Application layer for llm-council
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::DeliberationParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    event_sink::{ChannelEventSink, EventSink, EventStream},
    model_invoker::{InvocationFailure, InvocationOutput, InvocationRequest, ModelInvoker},
};
pub use use_cases::fan_out::{FanOutCancelled, FanOutExecutor, FanOutResult, Settled};
pub use use_cases::run_deliberation::{
    DeliberationError, DeliberationHandle, DeliberationInput, RunDeliberationUseCase,
};
