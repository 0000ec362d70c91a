use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use partstock_core::{Entity, PartId};
use partstock_parts::Part;

use super::r#trait::{apply_delta, PartStore, PartTransaction, StoreError};

type PartMap = HashMap<PartId, Part>;

/// In-memory part store.
///
/// Intended for tests/dev. A transaction holds the whole map for its lifetime,
/// so transactions are trivially serializable; writes are staged and only
/// reach the map on commit.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPartStore {
    parts: Arc<Mutex<PartMap>>,
}

impl InMemoryPartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All parts, in no particular order.
    pub async fn all(&self) -> Vec<Part> {
        self.parts.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl PartStore for InMemoryPartStore {
    async fn find_by_id(&self, id: &PartId) -> Result<Option<Part>, StoreError> {
        Ok(self.parts.lock().await.get(id).cloned())
    }

    async fn insert(&self, part: Part) -> Result<Part, StoreError> {
        let mut parts = self.parts.lock().await;
        let id = part.id().clone();
        if parts.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        parts.insert(id, part.clone());
        Ok(part)
    }

    async fn increment_stock(&self, id: &PartId, delta: i64) -> Result<(), StoreError> {
        let mut parts = self.parts.lock().await;
        let part = parts
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        match apply_delta(id, part.stock(), delta) {
            Ok(stock) => {
                parts.insert(id.clone(), part.with_stock(stock));
                Ok(())
            }
            Err(e) => {
                parts.insert(id.clone(), part);
                Err(e)
            }
        }
    }

    async fn begin(&self) -> Result<Box<dyn PartTransaction>, StoreError> {
        let guard = self.parts.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            guard,
            staged: HashMap::new(),
        }))
    }
}

/// Transaction over an [`InMemoryPartStore`].
///
/// Dropping it without `commit` discards the staged writes and releases the
/// lock, which is a rollback.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<PartMap>,
    staged: HashMap<PartId, u64>,
}

impl InMemoryTransaction {
    fn current_stock(&self, id: &PartId) -> Option<u64> {
        self.staged
            .get(id)
            .copied()
            .or_else(|| self.guard.get(id).map(Part::stock))
    }
}

#[async_trait]
impl PartTransaction for InMemoryTransaction {
    async fn lock_stock(&mut self, ids: &[PartId]) -> Result<HashMap<PartId, u64>, StoreError> {
        // The whole map is already held; just read through the staged layer.
        Ok(ids
            .iter()
            .filter_map(|id| self.current_stock(id).map(|s| (id.clone(), s)))
            .collect())
    }

    async fn increment_stock(&mut self, id: &PartId, delta: i64) -> Result<(), StoreError> {
        let current = self
            .current_stock(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let next = apply_delta(id, current, delta)?;
        self.staged.insert(id.clone(), next);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        for (id, stock) in staged {
            if let Some(part) = self.guard.remove(&id) {
                self.guard.insert(id, part.with_stock(stock));
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
