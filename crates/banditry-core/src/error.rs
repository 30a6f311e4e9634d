//! Error types for the bandit core library

use thiserror::Error;

/// Core error type for bandit operations
#[derive(Error, Debug)]
pub enum BanditError {
    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Invalid constructor or configuration parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An observation or policy info field needed by the caller is absent
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// Training was asked to run on an empty batch
    #[error("Empty experience: nothing to train on")]
    EmptyExperience,

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Size the operation requires
        expected: usize,
        /// Size it was given
        actual: usize,
    },

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for bandit operations
pub type Result<T> = std::result::Result<T, BanditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BanditError::DimensionMismatch {
            expected: 9,
            actual: 7,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 9, got 7");

        let err = BanditError::MissingFeature("per-arm observation".to_string());
        assert_eq!(err.to_string(), "Missing feature: per-arm observation");

        assert_eq!(
            BanditError::EmptyExperience.to_string(),
            "Empty experience: nothing to train on"
        );

        let err = BanditError::Agent("checkpoint holds a dotproduct network".to_string());
        assert_eq!(err.to_string(), "Agent error: checkpoint holds a dotproduct network");
    }
}
