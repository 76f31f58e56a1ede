//! Events streamed to the caller while a deliberation runs

use super::stage::Stage;
use super::value_objects::{ModelFailure, ModelResponse, PeerEvaluation, SynthesisResult};
use crate::anonymize::LabelMap;
use crate::core::model::ModelId;
use crate::ranking::{AggregateRanking, ConfidenceLeader, ConsensusSummary, HallucinationReport};
use serde::{Deserialize, Serialize};

/// Why a deliberation ended in an `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ErrorKind {
    /// A stage could not produce the minimum it needs (no Stage-1 answers,
    /// or the chairman failed)
    StageFatal { stage: u8 },
    /// The request was rejected before any stage started
    InvalidInput,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::StageFatal { stage } => write!(f, "stage {} failed", stage),
            ErrorKind::InvalidInput => write!(f, "invalid input"),
        }
    }
}

/// One event of the deliberation stream
///
/// Serialized with a snake_case `type` tag, e.g.
/// `{"type":"stage3_complete","model":"…","text":"…"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliberationEvent {
    Stage1Start {
        models: Vec<ModelId>,
    },
    /// One model call finished (either way); emitted in completion order
    ModelSettled {
        stage: u8,
        model: ModelId,
        success: bool,
        elapsed_ms: u64,
    },
    Stage1Complete {
        responses: Vec<ModelResponse>,
        failures: Vec<ModelFailure>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence_leader: Option<ConfidenceLeader>,
    },
    Stage2Start {
        reviewers: Vec<ModelId>,
    },
    Stage2Complete {
        evaluations: Vec<PeerEvaluation>,
        aggregate: Vec<AggregateRanking>,
        label_map: LabelMap,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        consensus: Option<ConsensusSummary>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hallucination: Option<HallucinationReport>,
        failures: Vec<ModelFailure>,
    },
    Stage3Start {
        chairman: ModelId,
    },
    Stage3Complete(SynthesisResult),
    TitleComplete {
        title: String,
    },
    Complete,
    Error {
        message: String,
        kind: ErrorKind,
    },
}

impl DeliberationEvent {
    pub fn stage_fatal(stage: Stage, message: impl Into<String>) -> Self {
        DeliberationEvent::Error {
            message: message.into(),
            kind: ErrorKind::StageFatal {
                stage: stage.number().unwrap_or(0),
            },
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        DeliberationEvent::Error {
            message: message.into(),
            kind: ErrorKind::InvalidInput,
        }
    }

    /// The `type` tag this event serializes with
    pub fn name(&self) -> &'static str {
        match self {
            DeliberationEvent::Stage1Start { .. } => "stage1_start",
            DeliberationEvent::ModelSettled { .. } => "model_settled",
            DeliberationEvent::Stage1Complete { .. } => "stage1_complete",
            DeliberationEvent::Stage2Start { .. } => "stage2_start",
            DeliberationEvent::Stage2Complete { .. } => "stage2_complete",
            DeliberationEvent::Stage3Start { .. } => "stage3_start",
            DeliberationEvent::Stage3Complete(_) => "stage3_complete",
            DeliberationEvent::TitleComplete { .. } => "title_complete",
            DeliberationEvent::Complete => "complete",
            DeliberationEvent::Error { .. } => "error",
        }
    }

    /// `complete` and `error` end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliberationEvent::Complete | DeliberationEvent::Error { .. }
        )
    }
}
