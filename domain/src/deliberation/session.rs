//! Deliberation session entity (aggregate root)

use super::chairman::ChairmanSelection;
use super::stage::Stage;
use super::value_objects::{ModelFailure, ModelResponse, PeerEvaluation, SynthesisResult};
use crate::anonymize::{Label, LabelMap};
use crate::conversation::entities::{ImageAttachment, Message};
use crate::core::error::DomainError;
use crate::core::model::ModelId;
use crate::core::question::Question;
use crate::ranking::{
    AggregateRanking, ConfidenceLeader, ConsensusSummary, HallucinationReport,
    HallucinationThresholds, VotingMethod, aggregate, detect_confidence_leader, detect_consensus,
    detect_hallucinations,
};
use serde::{Deserialize, Serialize};

/// One run of the council over a single question
///
/// Owns everything produced along the way. Only the state machine driving
/// the run mutates it, and every mutation checks the current [`Stage`].
#[derive(Debug, Clone)]
pub struct DeliberationSession {
    question: Question,
    history: Vec<Message>,
    images: Vec<ImageAttachment>,
    council: Vec<ModelId>,
    chairman: ModelId,
    stage: Stage,
    responses: Vec<ModelResponse>,
    stage1_failures: Vec<ModelFailure>,
    confidence_leader: Option<ConfidenceLeader>,
    label_map: LabelMap,
    evaluations: Vec<PeerEvaluation>,
    stage2_failures: Vec<ModelFailure>,
    aggregate: Vec<AggregateRanking>,
    consensus: Option<ConsensusSummary>,
    hallucination: Option<HallucinationReport>,
    synthesis: Option<SynthesisResult>,
    title: Option<String>,
}

impl DeliberationSession {
    /// Create a session in `Idle`
    ///
    /// Duplicate council entries are dropped, keeping the first occurrence.
    pub fn new(
        question: Question,
        council: Vec<ModelId>,
        chairman: ModelId,
    ) -> Result<Self, DomainError> {
        let mut unique: Vec<ModelId> = Vec::with_capacity(council.len());
        for model in council {
            if model.as_str().trim().is_empty() {
                return Err(DomainError::InvalidModel("empty model identifier".to_string()));
            }
            if !unique.contains(&model) {
                unique.push(model);
            }
        }
        if unique.is_empty() {
            return Err(DomainError::NoModels);
        }
        if chairman.as_str().trim().is_empty() {
            return Err(DomainError::InvalidModel("empty chairman identifier".to_string()));
        }

        Ok(Self {
            question,
            history: Vec::new(),
            images: Vec::new(),
            council: unique,
            chairman,
            stage: Stage::Idle,
            responses: Vec::new(),
            stage1_failures: Vec::new(),
            confidence_leader: None,
            label_map: LabelMap::default(),
            evaluations: Vec::new(),
            stage2_failures: Vec::new(),
            aggregate: Vec::new(),
            consensus: None,
            hallucination: None,
            synthesis: None,
            title: None,
        })
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    // ==================== Transitions ====================

    /// Move to the next stage (or `Aborted`)
    pub fn advance(&mut self, to: Stage) -> Result<(), DomainError> {
        self.stage = self.stage.transition_to(to)?;
        Ok(())
    }

    /// Abort unless already terminal
    pub fn abort(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = Stage::Aborted;
        }
    }

    /// Record the Stage-1 outcome and assign labels to the successes
    pub fn record_stage1(
        &mut self,
        responses: Vec<ModelResponse>,
        failures: Vec<ModelFailure>,
    ) -> Result<(), DomainError> {
        self.expect_stage(Stage::Stage1)?;
        self.label_map = LabelMap::assign(&responses);
        self.confidence_leader = detect_confidence_leader(&responses);
        self.responses = responses;
        self.stage1_failures = failures;
        Ok(())
    }

    /// Record the Stage-2 outcome, aggregating with `method`
    pub fn record_stage2(
        &mut self,
        evaluations: Vec<PeerEvaluation>,
        failures: Vec<ModelFailure>,
        method: VotingMethod,
    ) -> Result<(), DomainError> {
        self.expect_stage(Stage::Stage2)?;
        self.aggregate = aggregate(&evaluations, &self.label_map, &self.responses, method);
        self.consensus = detect_consensus(&evaluations, &self.label_map);
        self.hallucination = detect_hallucinations(
            &self.responses,
            &evaluations,
            &self.aggregate,
            &self.label_map,
            &HallucinationThresholds::default(),
        );
        self.evaluations = evaluations;
        self.stage2_failures = failures;
        Ok(())
    }

    pub fn record_synthesis(&mut self, result: SynthesisResult) -> Result<(), DomainError> {
        self.expect_stage(Stage::Stage3)?;
        self.synthesis = Some(result);
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), DomainError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(DomainError::IllegalTransition {
                from: self.stage.to_string(),
                to: expected.to_string(),
            })
        }
    }

    // ==================== Views ====================

    /// Labelled answer texts for the ranking prompt, without identities
    pub fn anonymized_responses(&self) -> Vec<(Label, &str)> {
        self.responses
            .iter()
            .filter_map(|r| {
                self.label_map
                    .label_for(&r.model)
                    .map(|label| (label.clone(), r.text.as_str()))
            })
            .collect()
    }

    /// Stage-1 answers paired with their labels, for the chairman
    pub fn labelled_responses(&self) -> Vec<(Option<&Label>, &ModelResponse)> {
        self.responses
            .iter()
            .map(|r| (self.label_map.label_for(&r.model), r))
            .collect()
    }

    /// Models that answered in Stage 1, in submission order
    pub fn reviewers(&self) -> Vec<ModelId> {
        self.responses.iter().map(|r| r.model.clone()).collect()
    }

    /// The model that should synthesize the final answer
    pub fn select_chairman(&self, selection: ChairmanSelection) -> ModelId {
        selection.select(&self.chairman, &self.aggregate, &self.responses)
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn images(&self) -> &[ImageAttachment] {
        &self.images
    }

    pub fn council(&self) -> &[ModelId] {
        &self.council
    }

    pub fn chairman(&self) -> &ModelId {
        &self.chairman
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn responses(&self) -> &[ModelResponse] {
        &self.responses
    }

    pub fn stage1_failures(&self) -> &[ModelFailure] {
        &self.stage1_failures
    }

    pub fn confidence_leader(&self) -> Option<&ConfidenceLeader> {
        self.confidence_leader.as_ref()
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    pub fn evaluations(&self) -> &[PeerEvaluation] {
        &self.evaluations
    }

    pub fn stage2_failures(&self) -> &[ModelFailure] {
        &self.stage2_failures
    }

    pub fn aggregate(&self) -> &[AggregateRanking] {
        &self.aggregate
    }

    pub fn consensus(&self) -> Option<&ConsensusSummary> {
        self.consensus.as_ref()
    }

    pub fn hallucination(&self) -> Option<&HallucinationReport> {
        self.hallucination.as_ref()
    }

    pub fn synthesis(&self) -> Option<&SynthesisResult> {
        self.synthesis.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Package a finished session for output
    ///
    /// Returns `None` unless the session reached `Done`.
    pub fn into_result(self) -> Option<DeliberationResult> {
        if self.stage != Stage::Done {
            return None;
        }
        let synthesis = self.synthesis?;
        Some(DeliberationResult {
            question: self.question.into_content(),
            title: self.title,
            responses: self.responses,
            stage1_failures: self.stage1_failures,
            confidence_leader: self.confidence_leader,
            label_map: self.label_map,
            evaluations: self.evaluations,
            stage2_failures: self.stage2_failures,
            aggregate: self.aggregate,
            consensus: self.consensus,
            hallucination: self.hallucination,
            synthesis,
        })
    }
}

/// Everything a completed deliberation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationResult {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub responses: Vec<ModelResponse>,
    pub stage1_failures: Vec<ModelFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_leader: Option<ConfidenceLeader>,
    pub label_map: LabelMap,
    pub evaluations: Vec<PeerEvaluation>,
    pub stage2_failures: Vec<ModelFailure>,
    pub aggregate: Vec<AggregateRanking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination: Option<HallucinationReport>,
    pub synthesis: SynthesisResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliberation::value_objects::FailureKind;
    use std::time::Duration;

    fn session() -> DeliberationSession {
        DeliberationSession::new(
            Question::parse("What is Rust?").unwrap(),
            vec![
                ModelId::new("a/one"),
                ModelId::new("b/two"),
                ModelId::new("c/three"),
            ],
            ModelId::new("a/one"),
        )
        .unwrap()
    }

    fn response(model: &str, text: &str) -> ModelResponse {
        ModelResponse::new(model, text, Duration::from_millis(10))
    }

    #[test]
    fn test_rejects_empty_council() {
        let err = DeliberationSession::new(
            Question::parse("Q?").unwrap(),
            vec![],
            ModelId::new("a/one"),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::NoModels);
    }

    #[test]
    fn test_deduplicates_council() {
        let session = DeliberationSession::new(
            Question::parse("Q?").unwrap(),
            vec![ModelId::new("a/one"), ModelId::new("a/one"), ModelId::new("b/two")],
            ModelId::new("a/one"),
        )
        .unwrap();
        assert_eq!(session.council().len(), 2);
    }

    #[test]
    fn test_record_requires_matching_stage() {
        let mut session = session();
        assert!(session.record_stage1(vec![], vec![]).is_err());
        session.advance(Stage::Stage1).unwrap();
        assert!(session.record_stage1(vec![], vec![]).is_ok());
        assert!(
            session
                .record_stage2(vec![], vec![], VotingMethod::AverageRank)
                .is_err()
        );
    }

    #[test]
    fn test_full_run_produces_result() {
        let mut session = session();
        session.advance(Stage::Stage1).unwrap();
        session
            .record_stage1(
                vec![response("a/one", "first"), response("c/three", "third")],
                vec![ModelFailure::new("b/two", FailureKind::Timeout, "slow")],
            )
            .unwrap();

        let anonymized = session.anonymized_responses();
        assert_eq!(anonymized.len(), 2);
        assert_eq!(anonymized[0].0.as_str(), "A");
        assert_eq!(anonymized[1], (Label::from_index(1), "third"));
        assert_eq!(session.reviewers(), vec![ModelId::new("a/one"), ModelId::new("c/three")]);

        session.advance(Stage::Stage2).unwrap();
        let b = Label::from_index(1);
        let a = Label::from_index(0);
        session
            .record_stage2(
                vec![PeerEvaluation::new("a/one", "B > A", vec![b.clone(), a.clone()])],
                vec![],
                VotingMethod::AverageRank,
            )
            .unwrap();
        assert_eq!(session.aggregate()[0].model, ModelId::new("c/three"));
        assert_eq!(
            session.select_chairman(ChairmanSelection::TopRanked),
            ModelId::new("c/three")
        );
        assert!(session.hallucination().is_some());

        session.advance(Stage::Stage3).unwrap();
        session
            .record_synthesis(SynthesisResult::new("a/one", "final"))
            .unwrap();
        session.advance(Stage::Done).unwrap();

        let result = session.into_result().unwrap();
        assert_eq!(result.synthesis.text, "final");
        assert_eq!(result.stage1_failures.len(), 1);
        assert_eq!(result.label_map.resolve(&b), Some(&ModelId::new("c/three")));
    }

    #[test]
    fn test_confidence_drives_leader_and_chairman() {
        let mut session = session();
        session.advance(Stage::Stage1).unwrap();
        session
            .record_stage1(
                vec![
                    response("a/one", "first").with_confidence(Some(3)),
                    response("b/two", "second").with_confidence(Some(10)),
                ],
                vec![],
            )
            .unwrap();

        let leader = session.confidence_leader().unwrap();
        assert_eq!(leader.model, ModelId::new("b/two"));
        assert_eq!(
            session.select_chairman(ChairmanSelection::HighestConfidence),
            ModelId::new("b/two")
        );
        assert_eq!(session.select_chairman(ChairmanSelection::Fixed), ModelId::new("a/one"));
    }

    #[test]
    fn test_aborted_session_has_no_result() {
        let mut session = session();
        session.advance(Stage::Stage1).unwrap();
        session.abort();
        assert_eq!(session.stage(), Stage::Aborted);
        assert!(session.into_result().is_none());
    }
}
