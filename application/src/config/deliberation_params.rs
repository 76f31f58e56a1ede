//! Deliberation parameters: use case control.
//!
//! [`DeliberationParams`] groups the static parameters that control a
//! [`RunDeliberationUseCase`](crate::use_cases::run_deliberation::RunDeliberationUseCase)
//! run. They are loaded once and shared read-only between sessions.

use council_domain::{ChairmanSelection, ModelId, VotingMethod};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deliberation control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationParams {
    /// Council members in submission order.
    pub council: Vec<ModelId>,
    /// Model that synthesizes the final answer.
    pub chairman: ModelId,
    /// Budget for the Stage-1 answer round.
    pub stage1_timeout: Duration,
    /// Budget for the Stage-2 ranking round.
    pub stage2_timeout: Duration,
    /// Budget for the chairman call.
    pub stage3_timeout: Duration,
    /// How peer rankings are combined.
    pub voting_method: VotingMethod,
    /// Ask Stage-1 models for a trailing `CONFIDENCE: X/10`.
    pub include_confidence: bool,
    /// Fixed chairman or author of the best-ranked answer.
    pub chairman_selection: ChairmanSelection,
    /// Generate a conversation title alongside the deliberation.
    pub generate_title: bool,
    /// Model used for the title.
    pub title_model: ModelId,
    /// Budget for the title call.
    pub title_timeout: Duration,
}

impl Default for DeliberationParams {
    fn default() -> Self {
        Self {
            council: ModelId::default_council(),
            chairman: ModelId::default_chairman(),
            stage1_timeout: Duration::from_secs(120),
            stage2_timeout: Duration::from_secs(120),
            stage3_timeout: Duration::from_secs(180),
            voting_method: VotingMethod::default(),
            include_confidence: true,
            chairman_selection: ChairmanSelection::default(),
            generate_title: false,
            title_model: ModelId::default_title_model(),
            title_timeout: Duration::from_secs(30),
        }
    }
}

impl DeliberationParams {
    // ==================== Builder Methods ====================

    pub fn with_council(mut self, council: Vec<ModelId>) -> Self {
        self.council = council;
        self
    }

    pub fn with_chairman(mut self, chairman: ModelId) -> Self {
        self.chairman = chairman;
        self
    }

    /// Set every stage budget at once
    pub fn with_stage_timeouts(
        mut self,
        stage1: Duration,
        stage2: Duration,
        stage3: Duration,
    ) -> Self {
        self.stage1_timeout = stage1;
        self.stage2_timeout = stage2;
        self.stage3_timeout = stage3;
        self
    }

    pub fn with_voting_method(mut self, method: VotingMethod) -> Self {
        self.voting_method = method;
        self
    }

    pub fn with_confidence(mut self, enabled: bool) -> Self {
        self.include_confidence = enabled;
        self
    }

    pub fn with_chairman_selection(mut self, selection: ChairmanSelection) -> Self {
        self.chairman_selection = selection;
        self
    }

    pub fn with_title(mut self, enabled: bool) -> Self {
        self.generate_title = enabled;
        self
    }

    pub fn with_title_model(mut self, model: ModelId) -> Self {
        self.title_model = model;
        self
    }

    pub fn with_title_timeout(mut self, timeout: Duration) -> Self {
        self.title_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = DeliberationParams::default();
        assert_eq!(params.council.len(), 5);
        assert_eq!(params.chairman, ModelId::default_chairman());
        assert_eq!(params.voting_method, VotingMethod::AverageRank);
        assert!(params.include_confidence);
        assert!(!params.generate_title);
        assert_eq!(params.title_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let params = DeliberationParams::default()
            .with_council(vec![ModelId::new("openai/o1")])
            .with_voting_method(VotingMethod::Borda)
            .with_stage_timeouts(
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
            )
            .with_title(true);

        assert_eq!(params.council, vec![ModelId::new("openai/o1")]);
        assert_eq!(params.voting_method, VotingMethod::Borda);
        assert_eq!(params.stage2_timeout, Duration::from_secs(2));
        assert!(params.generate_title);
    }
}
