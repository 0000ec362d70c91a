//! Stock adjustment: plain receipts for raw parts, transactional builds for
//! assemblies.
//!
//! ```text
//! build:  Started -> Checking -+-> AllSufficient -> Writing -> Committed (SUCCESS)
//!                              +-> InsufficientFound -> Aborted (FAILED)
//! ```
//!
//! The check and the writes run in one store transaction that locks every
//! touched record first, so no concurrent build can spend the same
//! constituent stock between the check and the write.

use std::time::Duration;

use tracing::{debug, info};

use partstock_core::{DomainError, PartId};
use partstock_parts::{AdjustOutcome, BuildPlan, Part, PartKind};

use crate::error::ServiceResult;
use crate::part_store::{run_transaction, Completion, PartStore, PartTransaction, StoreError};

/// Default bound on a build transaction.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(5);

/// Applies stock adjustments against a [`PartStore`].
#[derive(Debug)]
pub struct InventoryEngine<'a, S: ?Sized> {
    store: &'a S,
    tx_timeout: Duration,
}

impl<'a, S> InventoryEngine<'a, S>
where
    S: PartStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            tx_timeout: DEFAULT_TX_TIMEOUT,
        }
    }

    pub fn with_tx_timeout(mut self, tx_timeout: Duration) -> Self {
        self.tx_timeout = tx_timeout;
        self
    }

    /// Adjust stock by part kind: receive for raw parts, build for assemblies.
    pub async fn adjust(&self, part_id: &PartId, quantity: u64) -> ServiceResult<AdjustOutcome> {
        let part = self.load(part_id, quantity).await?;
        match part.kind() {
            PartKind::Raw => self.receive(&part, quantity).await,
            PartKind::Assembled => self.build(&part, quantity).await,
        }
    }

    /// Record `quantity` units of a raw part arriving. Assemblies are rejected;
    /// they only gain stock by being built.
    pub async fn receive_stock(&self, part_id: &PartId, quantity: u64) -> ServiceResult<AdjustOutcome> {
        let part = self.load(part_id, quantity).await?;
        if part.kind() != PartKind::Raw {
            return Err(DomainError::validation(format!(
                "part {part_id} is an assembly; build it instead of receiving it"
            ))
            .into());
        }
        self.receive(&part, quantity).await
    }

    /// Build `quantity` units of an assembly from constituent stock.
    pub async fn build_units(&self, part_id: &PartId, quantity: u64) -> ServiceResult<AdjustOutcome> {
        let part = self.load(part_id, quantity).await?;
        self.build(&part, quantity).await
    }

    async fn load(&self, part_id: &PartId, quantity: u64) -> ServiceResult<Part> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be >= 1").into());
        }
        self.store
            .find_by_id(part_id)
            .await?
            .ok_or_else(|| DomainError::not_found(part_id.clone()).into())
    }

    async fn receive(&self, part: &Part, quantity: u64) -> ServiceResult<AdjustOutcome> {
        let delta = i64::try_from(quantity)
            .map_err(|_| DomainError::validation("quantity is too large"))?;
        self.store.increment_stock(part.id_typed(), delta).await?;

        info!(part_id = %part.id_typed(), quantity, "stock received");
        Ok(AdjustOutcome::Success)
    }

    async fn build(&self, part: &Part, quantity: u64) -> ServiceResult<AdjustOutcome> {
        let plan = BuildPlan::for_part(part, quantity)?;

        let transaction = run_transaction(self.store, move |tx| {
            Box::pin(async move { build_in_transaction(tx, &plan).await })
        });

        // Dropping the transaction future on timeout rolls it back.
        let outcome = match tokio::time::timeout(self.tx_timeout, transaction).await {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(self.tx_timeout).into()),
        };

        if outcome.is_success() {
            info!(part_id = %part.id_typed(), quantity, "assembly built");
        } else {
            info!(part_id = %part.id_typed(), quantity, outcome = ?outcome, "assembly build refused");
        }
        Ok(outcome)
    }
}

/// Check-then-write phase of a build, run inside an open transaction.
async fn build_in_transaction(
    tx: &mut Box<dyn PartTransaction>,
    plan: &BuildPlan,
) -> Result<Completion<AdjustOutcome>, StoreError> {
    let stock = tx.lock_stock(&plan.touched_ids()).await?;
    if !stock.contains_key(plan.target()) {
        return Err(StoreError::NotFound(plan.target().clone()));
    }

    if let Some(short) = plan.first_shortfall(|id| stock.get(id).copied()) {
        debug!(part_id = %plan.target(), constituent = %short, "build aborted");
        return Ok(Completion::Rollback(AdjustOutcome::insufficient(short)));
    }

    for (id, delta) in plan.deltas() {
        tx.increment_stock(&id, delta).await?;
    }
    Ok(Completion::Commit(AdjustOutcome::Success))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PartServiceError;
    use crate::part_store::InMemoryPartStore;
    use chrono::Utc;
    use partstock_parts::Constituent;

    fn id(s: &str) -> PartId {
        PartId::from(s)
    }

    async fn stock_of(store: &InMemoryPartStore, part: &str) -> u64 {
        store.find_by_id(&id(part)).await.unwrap().unwrap().stock()
    }

    /// bolt (raw), nut (raw), gadget = 2 bolt + 3 nut.
    async fn fixture(bolts: i64, nuts: i64) -> InMemoryPartStore {
        let store = InMemoryPartStore::new();
        for raw in ["bolt", "nut"] {
            store
                .insert(Part::raw(id(raw), raw, Utc::now()).unwrap())
                .await
                .unwrap();
        }
        store
            .insert(
                Part::assembled(
                    id("gadget"),
                    "Gadget",
                    vec![Constituent::new("bolt", 2), Constituent::new("nut", 3)],
                    Utc::now(),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        if bolts > 0 {
            store.increment_stock(&id("bolt"), bolts).await.unwrap();
        }
        if nuts > 0 {
            store.increment_stock(&id("nut"), nuts).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn raw_adjust_adds_exactly_quantity() {
        let store = fixture(1, 1).await;
        let outcome = InventoryEngine::new(&store).adjust(&id("bolt"), 7).await.unwrap();

        assert_eq!(outcome, AdjustOutcome::Success);
        assert_eq!(stock_of(&store, "bolt").await, 8);
        assert_eq!(stock_of(&store, "nut").await, 1);
        assert_eq!(stock_of(&store, "gadget").await, 0);
    }

    #[tokio::test]
    async fn build_consumes_constituents_and_produces_target() {
        let store = fixture(10, 10).await;
        let outcome = InventoryEngine::new(&store).adjust(&id("gadget"), 3).await.unwrap();

        assert_eq!(outcome, AdjustOutcome::Success);
        assert_eq!(stock_of(&store, "bolt").await, 4);
        assert_eq!(stock_of(&store, "nut").await, 1);
        assert_eq!(stock_of(&store, "gadget").await, 3);
    }

    #[tokio::test]
    async fn insufficient_build_changes_nothing() {
        // bolt has enough, nut does not.
        let store = fixture(10, 5).await;
        let outcome = InventoryEngine::new(&store).adjust(&id("gadget"), 2).await.unwrap();

        assert_eq!(
            outcome,
            AdjustOutcome::Failed {
                message: "Insufficient quantity - nut".to_string()
            }
        );
        assert_eq!(stock_of(&store, "bolt").await, 10);
        assert_eq!(stock_of(&store, "nut").await, 5);
        assert_eq!(stock_of(&store, "gadget").await, 0);
    }

    #[tokio::test]
    async fn failure_names_first_short_constituent_only() {
        let store = fixture(0, 0).await;
        let outcome = InventoryEngine::new(&store).adjust(&id("gadget"), 1).await.unwrap();
        assert_eq!(outcome, AdjustOutcome::insufficient(&id("bolt")));
    }

    #[tokio::test]
    async fn unknown_part_is_not_found() {
        let store = fixture(0, 0).await;
        let err = InventoryEngine::new(&store).adjust(&id("ghost"), 1).await.unwrap_err();
        assert!(matches!(err, PartServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let store = fixture(5, 5).await;
        let err = InventoryEngine::new(&store).adjust(&id("bolt"), 0).await.unwrap_err();
        assert!(matches!(err, PartServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn receive_rejects_assemblies_and_build_rejects_raw() {
        let store = fixture(5, 5).await;
        let engine = InventoryEngine::new(&store);

        let err = engine.receive_stock(&id("gadget"), 1).await.unwrap_err();
        assert!(matches!(err, PartServiceError::Domain(DomainError::Validation(_))));

        let err = engine.build_units(&id("bolt"), 1).await.unwrap_err();
        assert!(matches!(err, PartServiceError::Domain(DomainError::Validation(_))));

        assert_eq!(engine.receive_stock(&id("bolt"), 2).await.unwrap(), AdjustOutcome::Success);
        assert_eq!(stock_of(&store, "bolt").await, 7);
    }

    /// Store whose transactions take `delay` to open.
    struct SlowBegin {
        inner: InMemoryPartStore,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl PartStore for SlowBegin {
        async fn find_by_id(&self, part_id: &PartId) -> Result<Option<Part>, StoreError> {
            self.inner.find_by_id(part_id).await
        }

        async fn insert(&self, part: Part) -> Result<Part, StoreError> {
            self.inner.insert(part).await
        }

        async fn increment_stock(&self, part_id: &PartId, delta: i64) -> Result<(), StoreError> {
            self.inner.increment_stock(part_id, delta).await
        }

        async fn begin(&self) -> Result<Box<dyn PartTransaction>, StoreError> {
            tokio::time::sleep(self.delay).await;
            self.inner.begin().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn build_times_out_without_side_effects() {
        let store = SlowBegin {
            inner: fixture(10, 10).await,
            delay: Duration::from_secs(60),
        };

        let err = InventoryEngine::new(&store)
            .with_tx_timeout(Duration::from_millis(50))
            .adjust(&id("gadget"), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, PartServiceError::Store(StoreError::Timeout(_))));
        assert_eq!(stock_of(&store.inner, "gadget").await, 0);
        assert_eq!(stock_of(&store.inner, "bolt").await, 10);
    }
}
