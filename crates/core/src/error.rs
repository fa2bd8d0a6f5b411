//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// lifecycle transitions, conflicts). Infrastructure concerns belong elsewhere.
/// Every variant is recoverable: callers surface the message and may retry
/// after re-reading the entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. out-of-range discount, empty reason).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity is not in a status from which the operation is allowed.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A domain invariant was violated (e.g. arithmetic overflow, id mismatch).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (stale version, double conversion, duplicate create).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor is not allowed to perform the operation.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Reject blank free-text input (reasons, notes).
///
/// Returns the trimmed text so callers store a normalized value.
pub fn require_text(value: &str, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("  out of stock ", "reason").unwrap(), "out of stock");

        let err = require_text("   ", "reason").unwrap_err();
        assert_eq!(err, DomainError::validation("reason must not be empty"));
    }
}
