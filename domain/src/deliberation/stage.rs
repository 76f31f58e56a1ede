//! Deliberation stage progression

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Where a deliberation currently is
///
/// Progression is strictly `Idle → Stage1 → Stage2 → Stage3 → Done`. Any
/// non-terminal stage may move to `Aborted`; terminal stages never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Stage1,
    Stage2,
    Stage3,
    Done,
    Aborted,
}

impl Stage {
    /// Numeric stage as shown to clients (`Idle` = 0)
    pub fn number(&self) -> Option<u8> {
        match self {
            Stage::Idle => Some(0),
            Stage::Stage1 => Some(1),
            Stage::Stage2 => Some(2),
            Stage::Stage3 => Some(3),
            Stage::Done | Stage::Aborted => None,
        }
    }

    /// The stage that follows on success
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Stage1),
            Stage::Stage1 => Some(Stage::Stage2),
            Stage::Stage2 => Some(Stage::Stage3),
            Stage::Stage3 => Some(Stage::Done),
            Stage::Done | Stage::Aborted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Aborted)
    }

    pub fn can_transition_to(&self, to: Stage) -> bool {
        match to {
            Stage::Aborted => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }

    /// Validate a transition, returning the new stage
    pub fn transition_to(self, to: Stage) -> Result<Stage, DomainError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::IllegalTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Stage1 => "stage1",
            Stage::Stage2 => "stage2",
            Stage::Stage3 => "stage3",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
