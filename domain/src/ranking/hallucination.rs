//! Hallucination signals derived from peer disagreement
//!
//! Compares what each council model claimed about its own answer (Stage-1
//! confidence) with how its peers ranked that answer (Stage 2):
//!
//! - **confidence mismatch**: high self-confidence, poor aggregate rank
//! - **peer rejection**: most other reviewers put the answer last
//! - **outlier**: reviewers disagree wildly about where the answer belongs
//!
//! Reviewers never count towards signals about their own answer except via
//! the aggregate rank.

use crate::anonymize::{Label, LabelMap};
use crate::core::model::ModelId;
use crate::deliberation::value_objects::{ModelResponse, PeerEvaluation};
use crate::ranking::AggregateRanking;
use serde::{Deserialize, Serialize};

/// How serious a signal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSeverity {
    Low,
    Medium,
    High,
}

impl SignalSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSeverity::Low => "low",
            SignalSeverity::Medium => "medium",
            SignalSeverity::High => "high",
        }
    }

    /// Score deducted from a model's reliability per signal
    fn penalty(&self) -> f64 {
        match self {
            SignalSeverity::Low => 0.05,
            SignalSeverity::Medium => 0.15,
            SignalSeverity::High => 0.3,
        }
    }
}

impl std::fmt::Display for SignalSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What triggered a signal, with the numbers behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SignalKind {
    ConfidenceMismatch {
        confidence: u8,
        average_rank: f64,
        mismatch: f64,
    },
    PeerRejection {
        last_place: usize,
        reviewers: usize,
    },
    Outlier {
        positions: Vec<usize>,
        std_dev: f64,
    },
}

impl SignalKind {
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::ConfidenceMismatch { .. } => "confidence_mismatch",
            SignalKind::PeerRejection { .. } => "peer_rejection",
            SignalKind::Outlier { .. } => "outlier",
        }
    }
}

/// One concern about one model's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationSignal {
    pub model: ModelId,
    pub severity: SignalSeverity,
    pub description: String,
    #[serde(flatten)]
    pub kind: SignalKind,
}

/// Per-model reliability in `0.0..=1.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReliability {
    pub model: ModelId,
    pub score: f64,
}

/// Detection thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HallucinationThresholds {
    /// Normalized confidence minus normalized rank above which a model is
    /// flagged as overconfident
    pub confidence_mismatch: f64,
    /// Share of other reviewers ranking an answer last
    pub peer_rejection: f64,
    /// Standard deviation of an answer's positions across reviewers
    pub rank_std_dev: f64,
}

impl Default for HallucinationThresholds {
    fn default() -> Self {
        Self {
            confidence_mismatch: 0.3,
            peer_rejection: 0.7,
            rank_std_dev: 2.0,
        }
    }
}

/// Everything the detector found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationReport {
    /// At least one medium or high severity signal
    pub has_concerns: bool,
    /// Mean reliability across answers
    pub overall_confidence: f64,
    pub signals: Vec<HallucinationSignal>,
    /// In Stage-1 submission order
    pub reliability: Vec<ModelReliability>,
    pub recommendations: Vec<String>,
}

impl HallucinationReport {
    pub fn signals_for<'a>(
        &'a self,
        model: &'a ModelId,
    ) -> impl Iterator<Item = &'a HallucinationSignal> + 'a {
        self.signals.iter().filter(move |s| &s.model == model)
    }
}

/// Analyze Stage-1 answers against their peer evaluations
///
/// Returns `None` when no evaluation is well-formed: every signal needs at
/// least one ranking.
pub fn detect_hallucinations(
    responses: &[ModelResponse],
    evaluations: &[PeerEvaluation],
    aggregate: &[AggregateRanking],
    label_map: &LabelMap,
    thresholds: &HallucinationThresholds,
) -> Option<HallucinationReport> {
    let rankings: Vec<&PeerEvaluation> = evaluations.iter().filter(|e| !e.is_malformed()).collect();
    if rankings.is_empty() {
        return None;
    }

    let average_rank = |model: &ModelId| {
        aggregate
            .iter()
            .find(|entry| &entry.model == model)
            .and_then(|entry| entry.average_rank)
    };

    let mut signals = Vec::new();
    for response in responses {
        signals.extend(confidence_mismatch(
            response,
            average_rank(&response.model),
            responses.len(),
            thresholds,
        ));
        let Some(label) = label_map.label_for(&response.model) else {
            continue;
        };
        let peers: Vec<&PeerEvaluation> = rankings
            .iter()
            .copied()
            .filter(|e| e.reviewer != response.model)
            .collect();
        signals.extend(peer_rejection(&response.model, label, &peers, thresholds));
        signals.extend(outlier(&response.model, label, &peers, thresholds));
    }

    let reliability: Vec<ModelReliability> = responses
        .iter()
        .map(|response| {
            let penalty: f64 = signals
                .iter()
                .filter(|s| s.model == response.model)
                .map(|s| s.severity.penalty())
                .sum();
            let bonus = match average_rank(&response.model) {
                Some(rank) if rank <= 1.5 => 0.1,
                _ => 0.0,
            };
            ModelReliability {
                model: response.model.clone(),
                score: (1.0 - penalty + bonus).clamp(0.0, 1.0),
            }
        })
        .collect();

    let has_concerns = signals.iter().any(|s| s.severity >= SignalSeverity::Medium);
    let overall_confidence = if reliability.is_empty() {
        0.5
    } else {
        reliability.iter().map(|r| r.score).sum::<f64>() / reliability.len() as f64
    };
    let recommendations = recommendations(has_concerns, &signals);

    Some(HallucinationReport {
        has_concerns,
        overall_confidence,
        signals,
        reliability,
        recommendations,
    })
}

fn confidence_mismatch(
    response: &ModelResponse,
    average_rank: Option<f64>,
    answers: usize,
    thresholds: &HallucinationThresholds,
) -> Option<HallucinationSignal> {
    let confidence = response.confidence?;
    let average_rank = average_rank?;
    let answers = answers as f64;

    // Both in 0..=1, higher is better
    let normalized_confidence = f64::from(confidence) / 10.0;
    let normalized_rank = (answers - average_rank + 1.0) / answers;
    let mismatch = normalized_confidence - normalized_rank;
    if mismatch <= thresholds.confidence_mismatch {
        return None;
    }

    let severity = if mismatch > 0.5 {
        SignalSeverity::High
    } else if mismatch > 0.3 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };
    Some(HallucinationSignal {
        model: response.model.clone(),
        severity,
        description: format!(
            "High confidence ({}/10) but ranked #{:.1} by peers",
            confidence, average_rank
        ),
        kind: SignalKind::ConfidenceMismatch {
            confidence,
            average_rank,
            mismatch,
        },
    })
}

fn peer_rejection(
    model: &ModelId,
    label: &Label,
    peers: &[&PeerEvaluation],
    thresholds: &HallucinationThresholds,
) -> Option<HallucinationSignal> {
    if peers.is_empty() {
        return None;
    }
    let last_place = peers
        .iter()
        .filter(|e| e.parsed_ranking.last() == Some(label))
        .count();
    let rate = last_place as f64 / peers.len() as f64;
    if rate < thresholds.peer_rejection {
        return None;
    }

    Some(HallucinationSignal {
        model: model.clone(),
        severity: if rate >= 0.9 {
            SignalSeverity::High
        } else {
            SignalSeverity::Medium
        },
        description: format!(
            "Ranked last by {}/{} peers ({:.0}%)",
            last_place,
            peers.len(),
            rate * 100.0
        ),
        kind: SignalKind::PeerRejection {
            last_place,
            reviewers: peers.len(),
        },
    })
}

fn outlier(
    model: &ModelId,
    label: &Label,
    peers: &[&PeerEvaluation],
    thresholds: &HallucinationThresholds,
) -> Option<HallucinationSignal> {
    let positions: Vec<usize> = peers.iter().filter_map(|e| e.position_of(label)).collect();
    if positions.len() < 2 {
        return None;
    }

    let n = positions.len() as f64;
    let mean = positions.iter().sum::<usize>() as f64 / n;
    let variance = positions
        .iter()
        .map(|p| (*p as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();
    if std_dev < thresholds.rank_std_dev {
        return None;
    }

    Some(HallucinationSignal {
        model: model.clone(),
        severity: SignalSeverity::Medium,
        description: format!("High disagreement among peers (std dev: {:.2})", std_dev),
        kind: SignalKind::Outlier { positions, std_dev },
    })
}

fn recommendations(has_concerns: bool, signals: &[HallucinationSignal]) -> Vec<String> {
    if !has_concerns {
        return vec![
            "No significant hallucination signals detected. Peer consensus appears strong."
                .to_string(),
        ];
    }

    let mut recommendations = Vec::new();
    if signals.iter().any(|s| s.severity == SignalSeverity::High) {
        recommendations.push(
            "High-severity concerns detected. Consider requesting clarification or \
             cross-referencing with external sources."
                .to_string(),
        );
    }
    if signals
        .iter()
        .any(|s| matches!(s.kind, SignalKind::ConfidenceMismatch { .. }))
    {
        recommendations.push(
            "Some models show overconfidence. Peer rankings may be more reliable than \
             self-reported confidence scores."
                .to_string(),
        );
    }
    let rejected: Vec<&str> = signals
        .iter()
        .filter(|s| matches!(s.kind, SignalKind::PeerRejection { .. }))
        .map(|s| s.model.as_str())
        .collect();
    if !rejected.is_empty() {
        recommendations.push(format!(
            "Response(s) from {} were consistently ranked poorly by peers. \
             Exercise caution with these responses.",
            rejected.join(", ")
        ));
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{VotingMethod, aggregate};
    use std::time::Duration;

    fn answered(model: &str, confidence: Option<u8>) -> ModelResponse {
        ModelResponse::new(model, "answer", Duration::from_millis(1)).with_confidence(confidence)
    }

    fn eval(reviewer: &str, order: &str) -> PeerEvaluation {
        let ranking = order
            .chars()
            .map(|c| Label::parse(&c.to_string()).unwrap())
            .collect();
        PeerEvaluation::new(reviewer, order, ranking)
    }

    fn report(responses: &[ModelResponse], evaluations: &[PeerEvaluation]) -> HallucinationReport {
        let map = LabelMap::assign(responses);
        let ranked = aggregate(evaluations, &map, responses, VotingMethod::AverageRank);
        detect_hallucinations(
            responses,
            evaluations,
            &ranked,
            &map,
            &HallucinationThresholds::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_overconfident_rejected_answer_is_flagged() {
        let responses = [
            answered("p/a", Some(9)),
            answered("p/b", Some(6)),
            answered("p/c", Some(5)),
        ];
        let evaluations = [eval("p/a", "BCA"), eval("p/b", "CBA"), eval("p/c", "BCA")];

        let report = report(&responses, &evaluations);

        assert!(report.has_concerns);
        let kinds: Vec<&str> = report
            .signals_for(&ModelId::new("p/a"))
            .map(|s| s.kind.name())
            .collect();
        assert_eq!(kinds, vec!["confidence_mismatch", "peer_rejection"]);
        assert!(
            report
                .signals_for(&ModelId::new("p/a"))
                .all(|s| s.severity == SignalSeverity::High)
        );
        assert_eq!(report.signals.len(), 2);

        // p/a loses 0.3 twice; p/b is top ranked (1.33) and capped at 1.0
        let scores: Vec<f64> = report.reliability.iter().map(|r| r.score).collect();
        assert!((scores[0] - 0.4).abs() < 1e-9);
        assert_eq!(scores[1], 1.0);
        assert_eq!(scores[2], 1.0);
        assert!((report.overall_confidence - 0.8).abs() < 1e-9);

        assert_eq!(report.recommendations.len(), 3);
        assert!(report.recommendations[2].contains("p/a"));
    }

    #[test]
    fn test_split_opinion_has_no_concerns() {
        let responses = [answered("p/a", None), answered("p/b", None)];
        let evaluations = [eval("p/a", "BA"), eval("p/b", "AB")];

        let report = report(&responses, &evaluations);

        assert!(!report.has_concerns);
        assert!(report.signals.is_empty());
        assert_eq!(report.overall_confidence, 1.0);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].starts_with("No significant"));
    }

    #[test]
    fn test_outlier_from_divergent_positions() {
        let responses: Vec<ModelResponse> =
            (0..5).map(|i| answered(&format!("p/m{i}"), None)).collect();
        // Only two reviewers ranked; they place A first and last
        let evaluations = [eval("p/m1", "ABCDE"), eval("p/m2", "BCDEA")];

        let report = report(&responses, &evaluations);

        let outliers: Vec<&HallucinationSignal> = report
            .signals
            .iter()
            .filter(|s| matches!(s.kind, SignalKind::Outlier { .. }))
            .collect();
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].model, ModelId::new("p/m0"));
        assert_eq!(outliers[0].severity, SignalSeverity::Medium);
        assert!(report.has_concerns);
    }

    #[test]
    fn test_own_ranking_is_not_peer_rejection() {
        // p/a ranks itself last; nobody else does
        let responses = [answered("p/a", None), answered("p/b", None)];
        let evaluations = [eval("p/a", "BA"), eval("p/b", "AB")];
        let report = report(&responses, &evaluations);
        assert!(report.signals_for(&ModelId::new("p/a")).next().is_none());
    }

    #[test]
    fn test_no_wellformed_ranking_yields_none() {
        let responses = [answered("p/a", Some(9))];
        let map = LabelMap::assign(&responses);
        let malformed = PeerEvaluation::new("p/a", "no idea", vec![]);
        assert!(
            detect_hallucinations(
                &responses,
                &[malformed],
                &[],
                &map,
                &HallucinationThresholds::default()
            )
            .is_none()
        );
    }

    #[test]
    fn test_signal_serializes_flat() {
        let signal = HallucinationSignal {
            model: ModelId::new("p/a"),
            severity: SignalSeverity::Medium,
            description: "Ranked last by 2/2 peers (100%)".into(),
            kind: SignalKind::PeerRejection {
                last_place: 2,
                reviewers: 2,
            },
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["signal"], "peer_rejection");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["last_place"], 2);
    }
}
