//! Value objects produced by the deliberation stages

use crate::anonymize::Label;
use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A successful Stage-1 answer from one council model (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model: ModelId,
    pub text: String,
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    /// Self-reported confidence in `1..=10`, when confidence prompting is on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

impl ModelResponse {
    pub fn new(model: impl Into<ModelId>, text: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
            elapsed,
            token_count: None,
            confidence: None,
        }
    }

    pub fn with_token_count(mut self, tokens: Option<u32>) -> Self {
        self.token_count = tokens;
        self
    }

    pub fn with_confidence(mut self, confidence: Option<u8>) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Closed set of reasons a single model call can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    RateLimited,
    InvalidResponse,
    TransportError,
    AuthError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::TransportError => "transport_error",
            FailureKind::AuthError => "auth_error",
        }
    }

    /// Whether a retry of the same call could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::RateLimited | FailureKind::TransportError
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A model call that did not produce a usable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: ModelId,
    pub kind: FailureKind,
    pub message: String,
}

impl ModelFailure {
    pub fn new(model: impl Into<ModelId>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(model: impl Into<ModelId>, limit: Duration) -> Self {
        Self::new(
            model,
            FailureKind::Timeout,
            format!("no response within {}s", limit.as_secs_f64()),
        )
    }
}

impl std::fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.model, self.kind, self.message)
    }
}

/// One reviewer's ranking of the anonymized Stage-1 answers
///
/// `parsed_ranking` is best first. An empty ranking marks the evaluation as
/// malformed: it is still shown to the user but ignored by aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEvaluation {
    pub reviewer: ModelId,
    pub raw_text: String,
    pub parsed_ranking: Vec<Label>,
}

impl PeerEvaluation {
    pub fn new(
        reviewer: impl Into<ModelId>,
        raw_text: impl Into<String>,
        parsed_ranking: Vec<Label>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            raw_text: raw_text.into(),
            parsed_ranking,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.parsed_ranking.is_empty()
    }

    /// 1-indexed position of `label` in this ranking
    pub fn position_of(&self, label: &Label) -> Option<usize> {
        self.parsed_ranking
            .iter()
            .position(|l| l == label)
            .map(|i| i + 1)
    }
}

/// The chairman's final answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub model: ModelId,
    pub text: String,
}

impl SynthesisResult {
    pub fn new(model: impl Into<ModelId>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
        }
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
