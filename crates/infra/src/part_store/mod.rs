//! Part storage boundary.
//!
//! This module defines the infrastructure-facing abstraction for reading and
//! writing part records, a scoped-transaction helper on top of it, and two
//! backends: an in-memory store for tests/dev and a Postgres store.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

pub use in_memory::InMemoryPartStore;
pub use postgres::PostgresPartStore;
pub use r#trait::{PartStore, PartTransaction, StoreError};

use crate::config::AppConfig;

/// How a transaction body wants its transaction to end.
///
/// Both arms carry the body's result: a body can finish normally and still ask
/// for a rollback (e.g. a build that found a constituent short).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    Commit(T),
    Rollback(T),
}

/// Run `body` inside a transaction with guaranteed release.
///
/// - `Completion::Commit` commits, `Completion::Rollback` rolls back
/// - an error from the body rolls back and is returned unchanged
/// - if the returned future is dropped mid-flight (timeout, caller
///   cancellation), the open transaction is dropped too, which rolls it back
pub async fn run_transaction<S, T, F>(store: &S, body: F) -> Result<T, StoreError>
where
    S: PartStore + ?Sized,
    F: for<'t> FnOnce(
        &'t mut Box<dyn PartTransaction>,
    ) -> BoxFuture<'t, Result<Completion<T>, StoreError>>,
{
    let mut tx = store.begin().await?;
    let result = body(&mut tx).await;

    match result {
        Ok(Completion::Commit(value)) => {
            tx.commit().await?;
            Ok(value)
        }
        Ok(Completion::Rollback(value)) => {
            tx.rollback().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed transaction body also failed");
            }
            Err(err)
        }
    }
}

/// Open the store selected by configuration: Postgres when `DATABASE_URL` is
/// set, otherwise a fresh in-memory store.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn PartStore>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresPartStore::connect(url, config.db_max_connections).await?;
            store.ensure_schema().await?;
            tracing::info!("using postgres part store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory part store");
            Ok(Arc::new(InMemoryPartStore::new()))
        }
    }
}
