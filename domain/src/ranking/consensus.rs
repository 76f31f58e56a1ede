//! Agreement signals: first-place votes among reviewers, and a Stage-1
//! confidence leader.

use crate::anonymize::{Label, LabelMap};
use crate::core::model::ModelId;
use crate::deliberation::value_objects::{ModelResponse, PeerEvaluation};
use serde::{Deserialize, Serialize};

/// How strongly reviewers agree on the best response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusSummary {
    pub top_label: Label,
    pub top_model: ModelId,
    /// Reviewers who put `top_label` first
    pub top_votes: usize,
    /// Well-formed evaluations considered
    pub total_voters: usize,
    /// `top_votes / total_voters`
    pub agreement: f64,
    /// Every reviewer agreed, and there was more than one
    pub unanimous: bool,
}

impl ConsensusSummary {
    /// Agreement at or above `threshold` (e.g. 0.75)
    pub fn is_strong(&self, threshold: f64) -> bool {
        self.agreement >= threshold
    }
}

/// Count first-place votes across the well-formed evaluations
///
/// Returns `None` when no evaluation is well-formed. A tie for most first
/// places goes to the earlier label.
pub fn detect_consensus(
    evaluations: &[PeerEvaluation],
    label_map: &LabelMap,
) -> Option<ConsensusSummary> {
    let firsts: Vec<&Label> = evaluations
        .iter()
        .filter_map(|e| e.parsed_ranking.first())
        .filter(|label| label_map.contains(label))
        .collect();
    if firsts.is_empty() {
        return None;
    }

    let total_voters = firsts.len();
    let (top_label, top_votes) = label_map
        .labels()
        .map(|label| (label, firsts.iter().filter(|first| **first == label).count()))
        .fold(None, |best: Option<(&Label, usize)>, (label, votes)| match best {
            Some((_, best_votes)) if best_votes >= votes => best,
            _ => Some((label, votes)),
        })?;
    let top_model = label_map.resolve(top_label)?.clone();

    Some(ConsensusSummary {
        top_label: top_label.clone(),
        top_model,
        top_votes,
        total_voters,
        agreement: top_votes as f64 / total_voters as f64,
        unanimous: top_votes == total_voters && total_voters > 1,
    })
}

/// Minimum confidence for a Stage-1 answer to lead
pub const LEADER_MIN_CONFIDENCE: u8 = 9;

/// Minimum lead over the mean confidence of the other answers
pub const LEADER_MIN_MARGIN: f64 = 3.0;

/// A Stage-1 answer whose author is far more confident than the rest
///
/// This is a signal only: the deliberation still runs every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceLeader {
    pub model: ModelId,
    pub confidence: u8,
    /// Mean confidence of the other answers that reported one (0 if none)
    pub others_average: f64,
}

/// Look for a confidence leader among the Stage-1 answers
///
/// The most confident answer (earliest on a tie) leads when it reports at
/// least [`LEADER_MIN_CONFIDENCE`] and beats the others' mean by
/// [`LEADER_MIN_MARGIN`]. Answers without a confidence are ignored.
pub fn detect_confidence_leader(responses: &[ModelResponse]) -> Option<ConfidenceLeader> {
    let scored: Vec<(&ModelId, u8)> = responses
        .iter()
        .filter_map(|r| r.confidence.map(|c| (&r.model, c)))
        .collect();
    let (index, &(model, confidence)) = scored
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &(&ModelId, u8))>, (i, entry)| match best {
            Some((_, (_, best_c))) if *best_c >= entry.1 => best,
            _ => Some((i, entry)),
        })?;
    if confidence < LEADER_MIN_CONFIDENCE {
        return None;
    }

    let others: Vec<f64> = scored
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, (_, c))| f64::from(*c))
        .collect();
    let others_average = if others.is_empty() {
        0.0
    } else {
        others.iter().sum::<f64>() / others.len() as f64
    };

    (f64::from(confidence) - others_average >= LEADER_MIN_MARGIN).then(|| ConfidenceLeader {
        model: model.clone(),
        confidence,
        others_average,
    })
}
