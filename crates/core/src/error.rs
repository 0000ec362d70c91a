//! Domain error model.

use thiserror::Error;

use crate::id::PartId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing references, graph shape). Storage faults belong elsewhere, and an
/// insufficient-stock build is an outcome, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request failed validation (unsupported kind, empty constituents, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced part does not exist.
    #[error("part with id {0} not found")]
    NotFound(PartId),

    /// The proposed assembly would close a cycle in the BOM graph.
    #[error("circular dependency detected: {0}")]
    CircularDependency(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(id: PartId) -> Self {
        Self::NotFound(id)
    }

    pub fn circular(msg: impl Into<String>) -> Self {
        Self::CircularDependency(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// True for errors caused by the caller's request rather than the system.
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_id() {
        let err = DomainError::not_found(PartId::from("bolt-1"));
        assert_eq!(err.to_string(), "part with id bolt-1 not found");
    }

    #[test]
    fn invariant_violations_are_not_client_faults() {
        assert!(DomainError::validation("x").is_client_fault());
        assert!(DomainError::circular("x").is_client_fault());
        assert!(!DomainError::invariant("x").is_client_fault());
    }
}
