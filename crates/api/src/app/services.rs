use std::sync::Arc;

use partstock_infra::{open_store, AppConfig, PartService, PartStore, StoreError};

/// The service type handlers see: backend chosen at startup.
pub type AppService = PartService<Arc<dyn PartStore>>;

pub type SharedService = Arc<AppService>;

/// Open the configured store and wrap it in a [`PartService`].
pub async fn build_services(config: &AppConfig) -> Result<SharedService, StoreError> {
    let store = open_store(config).await?;
    let service = PartService::new(store).with_tx_timeout(config.tx_timeout);
    tracing::info!(tx_timeout_ms = config.tx_timeout.as_millis() as u64, "part service ready");
    Ok(Arc::new(service))
}
