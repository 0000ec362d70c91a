//! Errors surfaced by the part service.

use thiserror::Error;

use partstock_core::DomainError;

use crate::part_store::StoreError;

/// Failure of a part-service operation.
///
/// `Domain` errors are the caller's fault and leave no side effects; `Store`
/// errors are systemic and are passed through as the store reported them.
#[derive(Debug, Error)]
pub enum PartServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PartServiceError {
    pub fn is_client_fault(&self) -> bool {
        match self {
            PartServiceError::Domain(e) => e.is_client_fault(),
            PartServiceError::Store(_) => false,
        }
    }
}

/// Result type used by the service layer.
pub type ServiceResult<T> = Result<T, PartServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use partstock_core::PartId;

    #[test]
    fn only_domain_refusals_are_client_faults() {
        assert!(PartServiceError::from(DomainError::validation("x")).is_client_fault());
        assert!(PartServiceError::from(DomainError::not_found(PartId::from("ghost"))).is_client_fault());
        assert!(!PartServiceError::from(DomainError::invariant("x")).is_client_fault());
        assert!(!PartServiceError::from(StoreError::NegativeStock(PartId::from("bolt"))).is_client_fault());
    }
}
