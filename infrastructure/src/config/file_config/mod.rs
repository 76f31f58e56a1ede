//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod council;
mod deliberation;
mod openrouter;
mod output;

pub use council::FileCouncilConfig;
pub use deliberation::FileDeliberationConfig;
pub use openrouter::{FileCircuitBreakerConfig, FileOpenRouterConfig, FileRetryConfig};
pub use output::FileOutputConfig;

use crate::openrouter::OpenRouterSettings;
use council_application::DeliberationParams;
use council_domain::{ChairmanSelection, ConfigIssue, ConfigIssueCode, VotingMethod};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Configuration that cannot be used
#[derive(Debug, Error)]
#[error("invalid configuration: {}", .issues.join("; "))]
pub struct ConfigValidationError {
    pub issues: Vec<String>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Council members and chairman
    pub council: FileCouncilConfig,
    /// Stage budgets and voting
    pub deliberation: FileDeliberationConfig,
    /// OpenRouter connection
    pub openrouter: FileOpenRouterConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration and return all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let council = &self.council;

        if council.models.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyCouncil,
                "council.models is empty: at least one model is required",
            ));
        }
        if council.models.iter().any(|m| m.trim().is_empty()) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyModelName,
                "council.models contains an empty model name",
            ));
        }

        let mut seen = HashSet::new();
        for model in council.model_ids() {
            if !seen.insert(model.clone()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateModel,
                    format!(
                        "{} is listed more than once in council.models; duplicates are ignored",
                        model
                    ),
                ));
            }
        }
        if seen.len() == 1 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::SingleModelCouncil,
                "council has a single model: peer ranking will have nothing to compare",
            ));
        }

        let named_models = [
            ("council.chairman", &council.chairman),
            ("council.title_model", &council.title_model),
        ];
        for (field, value) in named_models {
            if value.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyModelName,
                    format!("{} cannot be empty", field),
                ));
            }
        }

        let deliberation = &self.deliberation;
        if let Err(e) = deliberation.voting_method.parse::<VotingMethod>() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownVotingMethod,
                format!("{}; using {}", e, VotingMethod::default()),
            ));
        }
        if let Err(e) = deliberation.chairman_selection.parse::<ChairmanSelection>() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownChairmanSelection,
                format!("{}; using {}", e, ChairmanSelection::default().as_str()),
            ));
        }

        let timeouts = deliberation
            .timeout_fields()
            .into_iter()
            .chain(self.openrouter.timeout_fields());
        for (field, seconds) in timeouts {
            if seconds == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroTimeout,
                    format!("{} cannot be 0", field),
                ));
            }
        }

        issues
    }

    /// Validate, failing on errors and returning the warnings
    pub fn ensure_valid(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(ConfigIssue::is_error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError {
                issues: errors.into_iter().map(|issue| issue.message).collect(),
            })
        }
    }

    /// Parameters for the deliberation use case
    pub fn to_deliberation_params(&self) -> DeliberationParams {
        let [stage1, stage2, stage3] = self.deliberation.stage_timeouts();
        DeliberationParams::default()
            .with_council(self.council.model_ids())
            .with_chairman(self.council.chairman_id())
            .with_stage_timeouts(stage1, stage2, stage3)
            .with_voting_method(self.deliberation.voting_method())
            .with_confidence(self.deliberation.include_confidence)
            .with_chairman_selection(self.deliberation.chairman_selection())
            .with_title(self.deliberation.generate_title)
            .with_title_model(self.council.title_model_id())
            .with_title_timeout(Duration::from_secs(self.deliberation.title_timeout_seconds))
    }

    pub fn to_openrouter_settings(&self) -> OpenRouterSettings {
        self.openrouter.to_settings()
    }
}
