//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("No council models configured")]
    NoModels,

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Illegal stage transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_models_display() {
        assert_eq!(DomainError::NoModels.to_string(), "No council models configured");
    }

    #[test]
    fn test_illegal_transition_display() {
        let error = DomainError::IllegalTransition {
            from: "stage2".to_string(),
            to: "stage1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Illegal stage transition from stage2 to stage1"
        );
    }
}
