//! Deliberation behavior from TOML (`[deliberation]` section)

use council_domain::{ChairmanSelection, VotingMethod};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw deliberation configuration
///
/// `voting_method` and `chairman_selection` stay strings here so an unknown
/// value becomes a validation warning instead of a load failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeliberationConfig {
    pub stage1_timeout_seconds: u64,
    pub stage2_timeout_seconds: u64,
    pub stage3_timeout_seconds: u64,
    /// "average-rank", "borda" or "reciprocal-rank"
    pub voting_method: String,
    /// Ask for a trailing `CONFIDENCE: X/10` in Stage 1
    pub include_confidence: bool,
    /// "fixed" or "top-ranked"
    pub chairman_selection: String,
    pub generate_title: bool,
    pub title_timeout_seconds: u64,
}

impl Default for FileDeliberationConfig {
    fn default() -> Self {
        Self {
            stage1_timeout_seconds: 120,
            stage2_timeout_seconds: 120,
            stage3_timeout_seconds: 180,
            voting_method: VotingMethod::default().as_str().to_string(),
            include_confidence: true,
            chairman_selection: ChairmanSelection::default().as_str().to_string(),
            generate_title: false,
            title_timeout_seconds: 30,
        }
    }
}

impl FileDeliberationConfig {
    /// Parsed voting method; unknown values fall back to the default
    pub fn voting_method(&self) -> VotingMethod {
        self.voting_method.parse().unwrap_or_default()
    }

    /// Parsed chairman strategy; unknown values fall back to the default
    pub fn chairman_selection(&self) -> ChairmanSelection {
        self.chairman_selection.parse().unwrap_or_default()
    }

    pub fn stage_timeouts(&self) -> [Duration; 3] {
        [
            Duration::from_secs(self.stage1_timeout_seconds),
            Duration::from_secs(self.stage2_timeout_seconds),
            Duration::from_secs(self.stage3_timeout_seconds),
        ]
    }

    /// Named timeouts, for validation messages
    pub fn timeout_fields(&self) -> [(&'static str, u64); 4] {
        [
            ("deliberation.stage1_timeout_seconds", self.stage1_timeout_seconds),
            ("deliberation.stage2_timeout_seconds", self.stage2_timeout_seconds),
            ("deliberation.stage3_timeout_seconds", self.stage3_timeout_seconds),
            ("deliberation.title_timeout_seconds", self.title_timeout_seconds),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliberation_deserialize() {
        let toml_str = r#"
[deliberation]
stage2_timeout_seconds = 45
voting_method = "borda"
chairman_selection = "top-ranked"
generate_title = true
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let deliberation = &config.deliberation;
        assert_eq!(deliberation.stage2_timeout_seconds, 45);
        assert_eq!(deliberation.stage1_timeout_seconds, 120);
        assert_eq!(deliberation.voting_method(), VotingMethod::Borda);
        assert_eq!(deliberation.chairman_selection(), ChairmanSelection::TopRanked);
        assert!(deliberation.generate_title);
        assert!(deliberation.include_confidence);
    }

    #[test]
    fn test_confidence_driven_methods() {
        let toml_str = r#"
[deliberation]
voting_method = "confidence-weighted"
chairman_selection = "highest-confidence"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.deliberation.voting_method(),
            VotingMethod::ConfidenceWeighted
        );
        assert_eq!(
            config.deliberation.chairman_selection(),
            ChairmanSelection::HighestConfidence
        );
    }

    #[test]
    fn test_unknown_voting_method_falls_back() {
        let config = FileDeliberationConfig {
            voting_method: "condorcet".to_string(),
            ..Default::default()
        };
        assert_eq!(config.voting_method(), VotingMethod::AverageRank);
    }
}
