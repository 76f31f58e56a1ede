//! Model identity value object

use serde::{Deserialize, Serialize};

/// Opaque identifier of a backend model (Value Object)
///
/// Identifiers follow the `provider/model-name` convention used by
/// OpenRouter-style gateways (e.g. `"anthropic/claude-opus-4"`), but the
/// orchestrator never interprets them beyond display helpers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Create a new model identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the full identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider prefix, if the identifier has one
    ///
    /// E.g., "anthropic/claude-opus-4" -> Some("anthropic")
    pub fn provider(&self) -> Option<&str> {
        self.0.split_once('/').map(|(provider, _)| provider)
    }

    /// Short display name: the segment after the last `/`
    ///
    /// E.g., "anthropic/claude-opus-4" -> "claude-opus-4"
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Default council used when no configuration is present
    pub fn default_council() -> Vec<ModelId> {
        [
            "anthropic/claude-opus-4",
            "openai/o1",
            "google/gemini-2.5-pro-preview-06-05",
            "x-ai/grok-3-beta",
            "deepseek/deepseek-r1",
        ]
        .into_iter()
        .map(ModelId::new)
        .collect()
    }

    /// Default chairman used when no configuration is present
    pub fn default_chairman() -> ModelId {
        ModelId::new("anthropic/claude-opus-4")
    }

    /// Default model for conversation title generation
    pub fn default_title_model() -> ModelId {
        ModelId::new("google/gemini-2.5-flash")
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ModelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ModelId::new(s.trim()))
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        ModelId::new(s)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        ModelId::new(s)
    }
}
