//! Chairman selection

use crate::core::model::ModelId;
use crate::deliberation::value_objects::ModelResponse;
use crate::ranking::AggregateRanking;
use serde::{Deserialize, Serialize};

/// Which model synthesizes the final answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChairmanSelection {
    /// Always the configured chairman
    #[default]
    Fixed,
    /// The author of the best-ranked answer, falling back to the configured
    /// chairman when there is no ranking
    TopRanked,
    /// The Stage-1 author with the highest self-reported confidence; the
    /// earliest answer wins a tie, and without any confidence the configured
    /// chairman is kept
    HighestConfidence,
}

impl ChairmanSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChairmanSelection::Fixed => "fixed",
            ChairmanSelection::TopRanked => "top-ranked",
            ChairmanSelection::HighestConfidence => "highest-confidence",
        }
    }

    pub fn select(
        &self,
        configured: &ModelId,
        aggregate: &[AggregateRanking],
        responses: &[ModelResponse],
    ) -> ModelId {
        let chosen = match self {
            ChairmanSelection::Fixed => None,
            ChairmanSelection::TopRanked => aggregate
                .iter()
                .find(|entry| entry.has_votes())
                .map(|entry| &entry.model),
            ChairmanSelection::HighestConfidence => responses
                .iter()
                .filter_map(|r| r.confidence.map(|c| (c, &r.model)))
                .fold(None, |best: Option<(u8, &ModelId)>, (c, model)| match best {
                    Some((best_c, _)) if best_c >= c => best,
                    _ => Some((c, model)),
                })
                .map(|(_, model)| model),
        };
        chosen.unwrap_or(configured).clone()
    }
}

impl std::str::FromStr for ChairmanSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fixed" => Ok(ChairmanSelection::Fixed),
            "top-ranked" | "rotating" => Ok(ChairmanSelection::TopRanked),
            "highest-confidence" => Ok(ChairmanSelection::HighestConfidence),
            other => Err(format!(
                "Unknown chairman selection: {}. Valid: fixed, top-ranked, highest-confidence",
                other
            )),
        }
    }
}
