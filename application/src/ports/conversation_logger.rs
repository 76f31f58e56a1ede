//! Port for structured transcript logging.
//!
//! Defines the [`ConversationLogger`] trait for recording every event of a
//! deliberation to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! transcript in a machine-readable format (JSONL).

use chrono::{DateTime, Utc};
use council_domain::DeliberationEvent;
use serde_json::Value;

/// A structured transcript record.
///
/// Each record has a type string, a UTC timestamp, and a JSON payload
/// containing event-specific fields.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "stage1_complete", "model_settled").
    pub event_type: &'static str,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    /// Create a new record with the current UTC timestamp.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}

impl From<&DeliberationEvent> for ConversationEvent {
    fn from(event: &DeliberationEvent) -> Self {
        Self::new(
            event.name(),
            serde_json::to_value(event).unwrap_or(Value::Null),
        )
    }
}

/// Port for logging transcript records.
///
/// Implementations write each record as a single entry (e.g., one JSONL line).
/// The `log` method is synchronous and non-fallible; logging failures never
/// disturb the deliberation.
pub trait ConversationLogger: Send + Sync {
    /// Record a transcript event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_deliberation_event() {
        let event = DeliberationEvent::TitleComplete {
            title: "Rust Ownership".into(),
        };
        let record = ConversationEvent::from(&event);
        assert_eq!(record.event_type, "title_complete");
        assert_eq!(record.payload["title"], "Rust Ownership");
    }
}
