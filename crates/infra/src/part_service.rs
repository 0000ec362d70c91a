//! Part service: the entry point the boundary layer calls.
//!
//! ```text
//! create_part       -> mint id -> CreationDispatcher -> PartStore::insert
//! adjust_inventory  -> InventoryEngine (receive for RAW, build for ASSEMBLED)
//! ```
//!
//! The service holds no part state of its own; every call reads what it needs
//! from the store, so calls are independent and may run concurrently.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, Span};

use partstock_core::{DomainError, PartId};
use partstock_parts::{mint_part_id, AdjustOutcome, NewPart, Part};

use crate::creation::CreationDispatcher;
use crate::error::ServiceResult;
use crate::inventory_engine::{InventoryEngine, DEFAULT_TX_TIMEOUT};
use crate::part_store::PartStore;

/// Orchestrates part creation and stock adjustment over a [`PartStore`].
///
/// ## Generic Parameters
///
/// - `S`: store implementation; `InMemoryPartStore` in tests,
///   `Arc<dyn PartStore>` when the backend is picked at runtime
#[derive(Debug)]
pub struct PartService<S> {
    store: S,
    tx_timeout: Duration,
}

impl<S> PartService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tx_timeout: DEFAULT_TX_TIMEOUT,
        }
    }

    /// Bound on how long a build transaction may run before it is abandoned
    /// (and rolled back).
    pub fn with_tx_timeout(mut self, tx_timeout: Duration) -> Self {
        self.tx_timeout = tx_timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> PartService<S>
where
    S: PartStore,
{
    /// Register a new part under a freshly minted id.
    #[instrument(skip(self, request), fields(name = %request.name, kind = %request.kind, part_id = tracing::field::Empty), err)]
    pub async fn create_part(&self, request: NewPart) -> ServiceResult<Part> {
        let id = mint_part_id(&request.name);
        Span::current().record("part_id", id.as_str());
        self.create_part_with_id(id, request).await
    }

    /// Register a new part under a caller-chosen id.
    ///
    /// Fails with `StoreError::DuplicateId` if the id is taken.
    pub async fn create_part_with_id(&self, id: PartId, request: NewPart) -> ServiceResult<Part> {
        let part = CreationDispatcher::new(&self.store)
            .create(id, request, Utc::now())
            .await?;
        let part = self.store.insert(part).await?;

        info!(
            part_id = %part.id_typed(),
            kind = %part.kind(),
            constituents = part.constituents().len(),
            "part created"
        );
        Ok(part)
    }

    /// Adjust stock by part kind.
    ///
    /// Raw parts gain `quantity`. Assemblies are built: constituents are
    /// consumed and the assembly gains `quantity`, or nothing changes and the
    /// outcome is `Failed` naming the first short constituent.
    #[instrument(skip(self), fields(part_id = %part_id), err)]
    pub async fn adjust_inventory(&self, part_id: &PartId, quantity: u64) -> ServiceResult<AdjustOutcome> {
        self.engine().adjust(part_id, quantity).await
    }

    /// Goods receipt for a raw part.
    #[instrument(skip(self), fields(part_id = %part_id), err)]
    pub async fn receive_stock(&self, part_id: &PartId, quantity: u64) -> ServiceResult<AdjustOutcome> {
        self.engine().receive_stock(part_id, quantity).await
    }

    /// Build an assembly from constituent stock.
    #[instrument(skip(self), fields(part_id = %part_id), err)]
    pub async fn build_units(&self, part_id: &PartId, quantity: u64) -> ServiceResult<AdjustOutcome> {
        self.engine().build_units(part_id, quantity).await
    }

    pub async fn get_part(&self, part_id: &PartId) -> ServiceResult<Part> {
        self.store
            .find_by_id(part_id)
            .await?
            .ok_or_else(|| DomainError::not_found(part_id.clone()).into())
    }

    fn engine(&self) -> InventoryEngine<'_, S> {
        InventoryEngine::new(&self.store).with_tx_timeout(self.tx_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PartServiceError;
    use crate::part_store::{InMemoryPartStore, StoreError};
    use partstock_parts::{Constituent, PartKind};

    fn service() -> PartService<InMemoryPartStore> {
        PartService::new(InMemoryPartStore::new())
    }

    #[tokio::test]
    async fn created_raw_part_is_persisted_with_zero_stock() {
        let svc = service();
        let part = svc.create_part(NewPart::raw("Bolt")).await.unwrap();

        assert!(part.id_typed().as_str().starts_with("bolt-"));
        assert_eq!(part.kind(), PartKind::Raw);
        assert_eq!(part.stock(), 0);
        assert_eq!(svc.get_part(part.id_typed()).await.unwrap(), part);
    }

    #[tokio::test]
    async fn failed_creation_persists_nothing() {
        let svc = service();
        let err = svc
            .create_part(NewPart::assembled("Gadget", vec![Constituent::new("ghost", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, PartServiceError::Domain(DomainError::NotFound(_))));
        assert!(svc.store().all().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_explicit_id_is_a_store_error() {
        let svc = service();
        svc.create_part_with_id(PartId::from("bolt"), NewPart::raw("Bolt"))
            .await
            .unwrap();
        let err = svc
            .create_part_with_id(PartId::from("bolt"), NewPart::raw("Bolt"))
            .await
            .unwrap_err();
        assert!(matches!(err, PartServiceError::Store(StoreError::DuplicateId(_))));
    }

    #[tokio::test]
    async fn same_name_twice_yields_two_parts() {
        let svc = service();
        let a = svc.create_part(NewPart::raw("Bolt")).await.unwrap();
        let b = svc.create_part(NewPart::raw("Bolt")).await.unwrap();
        assert_ne!(a.id_typed(), b.id_typed());
    }

    #[tokio::test]
    async fn get_unknown_part_is_not_found() {
        let err = service().get_part(&PartId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, PartServiceError::Domain(DomainError::NotFound(_))));
    }
}
