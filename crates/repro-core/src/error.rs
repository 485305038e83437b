//! Error types for Repro Core
//!
//! We use `thiserror` for ergonomic error definitions with automatic
//! Display/Error implementations.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Script rejected by the static security gate
    #[error(transparent)]
    Security(#[from] SecurityViolation),

    /// A data-model invariant was broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Job lookup failed
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised when a candidate script contains unsafe constructs.
///
/// Carries the human-readable reason so it can be folded into the attempt's
/// ExecutionResult and fed back to the refine step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Security violation: {reason}")]
pub struct SecurityViolation {
    pub reason: String,
}

impl SecurityViolation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_violation_display() {
        let err = SecurityViolation::new("blocked import: os");
        assert_eq!(err.to_string(), "Security violation: blocked import: os");
    }

    #[test]
    fn test_core_error_from_violation() {
        let err: CoreError = SecurityViolation::new("blocked builtin: eval()").into();
        assert!(err.to_string().contains("eval"));
    }
}
