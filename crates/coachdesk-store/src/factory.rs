#[cfg(feature = "store-local")]
use crate::LocalStore;
use crate::{DocumentStore, MemoryStore, StoreBackend, StoreError, StoreResult};
use coachdesk_core::Config;
use std::sync::Arc;

/// Create a document store backend based on configuration
pub async fn create_store(config: &Config) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }

        #[cfg(feature = "store-local")]
        StoreBackend::Local => {
            let base_path = config.local_store_path.clone().ok_or_else(|| {
                StoreError::ConfigError("LOCAL_STORE_PATH not configured".to_string())
            })?;

            tracing::info!(path = %base_path, "Using local document store");
            let store = LocalStore::new(base_path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "store-local"))]
        StoreBackend::Local => Err(StoreError::ConfigError(
            "Local store backend not available (store-local feature not enabled)".to_string(),
        )),
    }
}
