//! Aggregation of peer evaluations into a single ranking

use crate::anonymize::{Label, LabelMap};
use crate::core::model::ModelId;
use crate::deliberation::value_objects::{ModelResponse, PeerEvaluation};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How individual peer rankings are combined
///
/// # Example
///
/// ```
/// use council_domain::ranking::VotingMethod;
///
/// let method: VotingMethod = "borda".parse().unwrap();
/// assert_eq!(method, VotingMethod::Borda);
/// assert!(method.uses_score());
/// assert!(!VotingMethod::default().uses_score());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VotingMethod {
    /// Mean 1-indexed position, lower is better
    #[default]
    AverageRank,
    /// First place earns N points, second N-1, and so on
    Borda,
    /// Mean of 1/position across evaluations, higher is better
    ReciprocalRank,
    /// Borda points scaled by each reviewer's own Stage-1 confidence
    ///
    /// A reviewer's weight is `0.5 + confidence / 10`; a reviewer without a
    /// confidence counts as 5/10 (weight 1.0), so a run without any
    /// confidence data scores exactly like [`VotingMethod::Borda`].
    ConfidenceWeighted,
}

impl VotingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingMethod::AverageRank => "average-rank",
            VotingMethod::Borda => "borda",
            VotingMethod::ReciprocalRank => "reciprocal-rank",
            VotingMethod::ConfidenceWeighted => "confidence-weighted",
        }
    }

    /// Whether entries are ordered by `score` rather than `average_rank`
    pub fn uses_score(&self) -> bool {
        !matches!(self, VotingMethod::AverageRank)
    }
}

impl std::fmt::Display for VotingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VotingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "average-rank" | "average" | "simple" => Ok(VotingMethod::AverageRank),
            "borda" => Ok(VotingMethod::Borda),
            "reciprocal-rank" | "mrr" => Ok(VotingMethod::ReciprocalRank),
            "confidence-weighted" | "confidence" => Ok(VotingMethod::ConfidenceWeighted),
            other => Err(format!(
                "Unknown voting method: {}. \
                 Valid: average-rank, borda, reciprocal-rank, confidence-weighted",
                other
            )),
        }
    }
}

/// Combined standing of one anonymized response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub label: Label,
    pub model: ModelId,
    /// Mean 1-indexed position; `None` when no evaluation ranked this label
    pub average_rank: Option<f64>,
    pub vote_count: usize,
    /// Method-specific score (Borda points, weighted Borda points or mean
    /// reciprocal rank)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl AggregateRanking {
    pub fn has_votes(&self) -> bool {
        self.vote_count > 0
    }
}

/// Confidence assumed for a reviewer that reported none
const NEUTRAL_CONFIDENCE: u8 = 5;

/// Combine the well-formed evaluations into one ranking, best first
///
/// Malformed evaluations are ignored. If none is well-formed the result is
/// empty; otherwise every label in `label_map` appears exactly once, with
/// labels nobody ranked reported as zero-vote entries at the end. Ties keep
/// label order. `responses` supplies reviewer confidence and is only read by
/// [`VotingMethod::ConfidenceWeighted`].
pub fn aggregate(
    evaluations: &[PeerEvaluation],
    label_map: &LabelMap,
    responses: &[ModelResponse],
    method: VotingMethod,
) -> Vec<AggregateRanking> {
    let valid: Vec<(&PeerEvaluation, f64)> = evaluations
        .iter()
        .filter(|e| !e.is_malformed())
        .map(|e| (e, reviewer_weight(&e.reviewer, responses)))
        .collect();
    if valid.is_empty() || label_map.is_empty() {
        return Vec::new();
    }

    let candidates = label_map.len();
    let borda_points = |position: usize| (candidates + 1).saturating_sub(position) as f64;
    let mut entries: Vec<AggregateRanking> = label_map
        .resolve_all()
        .iter()
        .map(|(label, model)| {
            // (position, reviewer weight) for every evaluation ranking this label
            let votes: Vec<(usize, f64)> = valid
                .iter()
                .filter_map(|(e, weight)| e.position_of(label).map(|p| (p, *weight)))
                .collect();
            let vote_count = votes.len();
            let average_rank = (vote_count > 0)
                .then(|| votes.iter().map(|(p, _)| p).sum::<usize>() as f64 / vote_count as f64);
            let score = (vote_count > 0).then(|| match method {
                VotingMethod::AverageRank => None,
                VotingMethod::Borda => Some(votes.iter().map(|(p, _)| borda_points(*p)).sum()),
                VotingMethod::ReciprocalRank => Some(
                    votes.iter().map(|(p, _)| 1.0 / *p as f64).sum::<f64>() / valid.len() as f64,
                ),
                VotingMethod::ConfidenceWeighted => {
                    Some(votes.iter().map(|(p, w)| borda_points(*p) * w).sum())
                }
            });

            AggregateRanking {
                label: label.clone(),
                model: model.clone(),
                average_rank,
                vote_count,
                score: score.flatten(),
            }
        })
        .collect();

    // Stable sort: equal entries stay in label order.
    entries.sort_by(|a, b| compare(a, b, method));
    entries
}

/// Voting weight of a reviewer: `0.5 + confidence / 10`
fn reviewer_weight(reviewer: &ModelId, responses: &[ModelResponse]) -> f64 {
    let confidence = responses
        .iter()
        .find(|r| &r.model == reviewer)
        .and_then(|r| r.confidence)
        .unwrap_or(NEUTRAL_CONFIDENCE);
    0.5 + f64::from(confidence) / 10.0
}

fn compare(a: &AggregateRanking, b: &AggregateRanking, method: VotingMethod) -> Ordering {
    match (a.has_votes(), b.has_votes()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => return Ordering::Equal,
        (true, true) => {}
    }

    if method.uses_score() {
        let (sa, sb) = (a.score.unwrap_or(0.0), b.score.unwrap_or(0.0));
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    } else {
        let (ra, rb) = (a.average_rank.unwrap_or(f64::MAX), b.average_rank.unwrap_or(f64::MAX));
        ra.partial_cmp(&rb).unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(c: &str) -> Label {
        Label::parse(c).unwrap()
    }

    fn ranking(order: &str) -> Vec<Label> {
        order.chars().map(|c| label(&c.to_string())).collect()
    }

    fn map(n: usize) -> LabelMap {
        let models: Vec<ModelId> = (0..n).map(|i| ModelId::new(format!("p/m{i}"))).collect();
        LabelMap::from_models(&models)
    }

    fn eval(reviewer: &str, order: &str) -> PeerEvaluation {
        PeerEvaluation::new(reviewer, order, ranking(order))
    }

    fn labels_of(entries: &[AggregateRanking]) -> String {
        entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn test_average_rank_with_tie() {
        let result = aggregate(
            &[eval("p/m0", "ABC"), eval("p/m1", "BAC")],
            &map(3),
            &[],
            VotingMethod::AverageRank,
        );
        assert_eq!(labels_of(&result), "ABC");
        assert_eq!(result[0].average_rank, Some(1.5));
        assert_eq!(result[1].average_rank, Some(1.5));
        assert_eq!(result[2].average_rank, Some(3.0));
        assert!(result.iter().all(|e| e.vote_count == 2 && e.score.is_none()));
    }

    #[test]
    fn test_entries_resolve_to_models() {
        let result = aggregate(&[eval("p/m0", "BA")], &map(2), &[], VotingMethod::AverageRank);
        assert_eq!(result[0].label, label("B"));
        assert_eq!(result[0].model, ModelId::new("p/m1"));
    }

    #[test]
    fn test_malformed_evaluations_ignored() {
        let malformed = PeerEvaluation::new("p/m2", "no opinion", vec![]);
        let result = aggregate(
            &[malformed, eval("p/m0", "CAB")],
            &map(3),
            &[],
            VotingMethod::AverageRank,
        );
        assert_eq!(labels_of(&result), "CAB");
        assert!(result.iter().all(|e| e.vote_count == 1));
    }

    #[test]
    fn test_no_valid_evaluation_is_empty() {
        let malformed = PeerEvaluation::new("p/m0", "??", vec![]);
        assert!(aggregate(&[malformed], &map(3), &[], VotingMethod::AverageRank).is_empty());
        assert!(aggregate(&[], &map(3), &[], VotingMethod::Borda).is_empty());
    }

    #[test]
    fn test_zero_vote_label_sorted_last() {
        // Evaluations built directly may omit labels; the parser would fill them in.
        let partial = PeerEvaluation::new("p/m0", "B", ranking("B"));
        let result = aggregate(&[partial], &map(3), &[], VotingMethod::AverageRank);
        assert_eq!(labels_of(&result), "BAC");
        assert_eq!(result[1].vote_count, 0);
        assert_eq!(result[1].average_rank, None);
        assert_eq!(result[2].average_rank, None);
    }

    #[test]
    fn test_borda_scores() {
        let result = aggregate(
            &[eval("p/m0", "ABC"), eval("p/m1", "BAC"), eval("p/m2", "BCA")],
            &map(3),
            &[],
            VotingMethod::Borda,
        );
        // B: 2+3+3 = 8, A: 3+2+1 = 6, C: 1+1+2 = 4
        assert_eq!(labels_of(&result), "BAC");
        assert_eq!(result[0].score, Some(8.0));
        assert_eq!(result[1].score, Some(6.0));
        assert_eq!(result[2].score, Some(4.0));
    }

    #[test]
    fn test_reciprocal_rank_scores() {
        let result = aggregate(
            &[eval("p/m0", "AB"), eval("p/m1", "BA")],
            &map(2),
            &[],
            VotingMethod::ReciprocalRank,
        );
        // Both average (1 + 0.5) / 2; tie keeps label order
        assert_eq!(labels_of(&result), "AB");
        assert_eq!(result[0].score, Some(0.75));
        assert_eq!(result[1].score, Some(0.75));
    }

    fn answered(model: &str, confidence: Option<u8>) -> ModelResponse {
        ModelResponse::new(model, "answer", std::time::Duration::from_millis(1))
            .with_confidence(confidence)
    }

    #[test]
    fn test_confidence_weighted_breaks_borda_tie() {
        let evals = [eval("p/m0", "BA"), eval("p/m1", "AB")];
        let responses = [answered("p/m0", Some(10)), answered("p/m1", Some(2))];

        let borda = aggregate(&evals, &map(2), &responses, VotingMethod::Borda);
        assert_eq!(labels_of(&borda), "AB");
        assert_eq!(borda[0].score, borda[1].score);

        // p/m0 weighs 1.5, p/m1 weighs 0.7
        let weighted = aggregate(&evals, &map(2), &responses, VotingMethod::ConfidenceWeighted);
        assert_eq!(labels_of(&weighted), "BA");
        assert!((weighted[0].score.unwrap() - 3.7).abs() < 1e-9);
        assert!((weighted[1].score.unwrap() - 2.9).abs() < 1e-9);
        assert_eq!(weighted[0].average_rank, Some(1.5));
    }

    #[test]
    fn test_confidence_weighted_without_confidence_matches_borda() {
        let evals = [eval("p/m0", "ABC"), eval("p/m1", "BAC"), eval("p/m2", "BCA")];
        let responses = [
            answered("p/m0", None),
            answered("p/m1", None),
            answered("p/m2", None),
        ];

        let borda = aggregate(&evals, &map(3), &responses, VotingMethod::Borda);
        let weighted = aggregate(&evals, &map(3), &responses, VotingMethod::ConfidenceWeighted);
        assert_eq!(weighted, borda);
        assert_eq!(weighted[0].score, Some(8.0));
    }

    #[test]
    fn test_voting_method_from_str() {
        assert_eq!("mrr".parse::<VotingMethod>().unwrap(), VotingMethod::ReciprocalRank);
        assert_eq!("average_rank".parse::<VotingMethod>().unwrap(), VotingMethod::AverageRank);
        assert_eq!(
            "confidence_weighted".parse::<VotingMethod>().unwrap(),
            VotingMethod::ConfidenceWeighted
        );
        assert!("condorcet".parse::<VotingMethod>().is_err());
    }

    #[test]
    fn test_voting_method_serde_kebab() {
        let json = serde_json::to_string(&VotingMethod::ReciprocalRank).unwrap();
        assert_eq!(json, "\"reciprocal-rank\"");
    }
}
