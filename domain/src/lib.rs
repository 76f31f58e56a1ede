//! Domain layer for llm-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A council is an ordered list of models that answer the same question
//! independently. A designated chairman turns their work into one answer.
//!
//! ## Deliberation
//!
//! - **Stage 1**: every council model answers
//! - **Stage 2**: the survivors rank each other's answers, anonymized as
//!   "Response A", "Response B", …
//! - **Stage 3**: the chairman synthesizes, seeing identities, rankings and
//!   the aggregate standing

pub mod anonymize;
pub mod config;
pub mod conversation;
pub mod core;
pub mod deliberation;
pub mod prompt;
pub mod ranking;

// Re-export commonly used types
pub use anonymize::{Label, LabelMap};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use conversation::entities::{ImageAttachment, Message, Role};
pub use core::{error::DomainError, model::ModelId, question::Question};
pub use deliberation::{
    chairman::ChairmanSelection,
    event::{DeliberationEvent, ErrorKind},
    session::{DeliberationResult, DeliberationSession},
    stage::Stage,
    title::{FALLBACK_TITLE, clean_title},
    value_objects::{FailureKind, ModelFailure, ModelResponse, PeerEvaluation, SynthesisResult},
};
pub use prompt::PromptTemplate;
pub use ranking::{
    AggregateRanking, ConfidenceLeader, ConsensusSummary, HallucinationReport,
    HallucinationSignal, HallucinationThresholds, SignalKind, SignalSeverity, VotingMethod,
    aggregate, detect_confidence_leader, detect_consensus, detect_hallucinations,
    parse_confidence, parse_ranking,
};
