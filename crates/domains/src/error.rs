//! # AppError
//!
//! Centralized error handling for topic-board.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found, or hidden from the caller (the two are not distinguished)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., negative offset, empty reply)
    #[error("validation error: {0}")]
    Validation(String),

    /// Container type this core does not serve yet
    #[error("not supported: {0}")]
    Unimplemented(String),

    /// Stored data breaks a structural invariant; not retryable
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    /// Credential present but unusable
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, transaction aborted)
    #[error("internal service error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &str, id: impl ToString) -> Self {
        AppError::NotFound(what.to_string(), id.to_string())
    }
}

/// A specialized Result type for topic-board logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_resource_and_id() {
        let err = AppError::not_found("topic", 42);
        assert_eq!(err.to_string(), "topic not found with ID 42");
    }

    #[test]
    fn anyhow_errors_become_internal() {
        let err: AppError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
