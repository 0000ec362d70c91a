use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use partstock_core::PartId;
use partstock_parts::Part;

/// Part store operation error.
///
/// These are **infrastructure errors** (storage, constraint, timeout) as opposed
/// to domain errors (validation, missing references). They propagate to the
/// caller unchanged; nothing in this crate retries them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("part {0} already exists")]
    DuplicateId(PartId),

    #[error("part {0} does not exist in the store")]
    NotFound(PartId),

    #[error("stock of part {0} would become negative")]
    NegativeStock(PartId),

    #[error("transaction did not finish within {0:?}")]
    Timeout(Duration),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable keyed storage for parts.
///
/// The store is the sole owner of part state. Part definitions never change
/// after `insert`; only stock moves, either through the single-record
/// `increment_stock` or inside a transaction from `begin`.
///
/// ## Implementation Requirements
///
/// - `insert` fails with `DuplicateId` if the id is present
/// - `increment_stock` is atomic and refuses to take stock below zero
/// - a transaction from `begin` is serializable with respect to every record
///   it locks, and rolls back if dropped without `commit`
#[async_trait]
pub trait PartStore: Send + Sync {
    async fn find_by_id(&self, id: &PartId) -> Result<Option<Part>, StoreError>;

    async fn insert(&self, part: Part) -> Result<Part, StoreError>;

    /// Atomically add `delta` (may be negative) to a part's stock.
    async fn increment_stock(&self, id: &PartId, delta: i64) -> Result<(), StoreError>;

    /// Open a transaction. Prefer [`run_transaction`](super::run_transaction),
    /// which guarantees commit/rollback on every exit path.
    async fn begin(&self) -> Result<Box<dyn PartTransaction>, StoreError>;
}

/// An open multi-record transaction.
#[async_trait]
pub trait PartTransaction: Send {
    /// Lock the given records for the rest of the transaction and return their
    /// current stock. Ids that do not resolve are absent from the map.
    async fn lock_stock(&mut self, ids: &[PartId]) -> Result<HashMap<PartId, u64>, StoreError>;

    /// Add `delta` to a locked record's stock, visible to later reads in this
    /// transaction and to everyone else after commit.
    async fn increment_stock(&mut self, id: &PartId, delta: i64) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> PartStore for Arc<S>
where
    S: PartStore + ?Sized,
{
    async fn find_by_id(&self, id: &PartId) -> Result<Option<Part>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn insert(&self, part: Part) -> Result<Part, StoreError> {
        (**self).insert(part).await
    }

    async fn increment_stock(&self, id: &PartId, delta: i64) -> Result<(), StoreError> {
        (**self).increment_stock(id, delta).await
    }

    async fn begin(&self) -> Result<Box<dyn PartTransaction>, StoreError> {
        (**self).begin().await
    }
}

/// Apply a signed delta to a stock level, refusing to go below zero.
pub(crate) fn apply_delta(id: &PartId, stock: u64, delta: i64) -> Result<u64, StoreError> {
    let next = i128::from(stock) + i128::from(delta);
    if next < 0 {
        return Err(StoreError::NegativeStock(id.clone()));
    }
    u64::try_from(next).map_err(|_| StoreError::Backend(format!("stock of part {id} overflowed")))
}
