//! Peer ranking: parsing reviewer output and combining the results.
//!
//! - [`parsing::parse_ranking`]: free text → ordered labels
//! - [`aggregate::aggregate`]: evaluations → combined ranking
//! - [`consensus::detect_consensus`]: first-place agreement
//! - [`consensus::detect_confidence_leader`]: one Stage-1 answer far more
//!   confident than the rest
//! - [`hallucination::detect_hallucinations`]: confidence and ranking
//!   disagreement per answer

pub mod aggregate;
pub mod consensus;
pub mod hallucination;
pub mod parsing;

pub use aggregate::{AggregateRanking, VotingMethod, aggregate};
pub use consensus::{ConfidenceLeader, ConsensusSummary, detect_confidence_leader, detect_consensus};
pub use hallucination::{
    HallucinationReport, HallucinationSignal, HallucinationThresholds, ModelReliability,
    SignalKind, SignalSeverity, detect_hallucinations,
};
pub use parsing::{FINAL_RANKING_MARKER, parse_confidence, parse_ranking};
