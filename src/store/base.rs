use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{memory_store::MemoryStore, no_store::NoStore};
use crate::config::{StoreBackend, StoreConfig};

/// The Store trait abstracts key-value persistence for auth state.
/// Items are keyed by `(item name, config_id)` so multiple identity-provider
/// configurations never collide. Pluggable: in-memory, browser storage
/// adapters, or custom.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read(&self, item: &str, config_id: &str) -> Result<Option<String>, String>;
    async fn write(&self, item: &str, config_id: &str, value: &str) -> Result<(), String>;
    async fn remove(&self, item: &str, config_id: &str) -> Result<(), String>;
    /// Removes every item stored under `config_id`.
    async fn clear(&self, config_id: &str) -> Result<(), String>;
    fn is_enabled(&self) -> bool {
        // Default implementation should return always True for real stores
        // No store will return false so we can write better debug messages
        true
    }
}

/// Creates a concrete store implementation based on the StoreConfig.
/// If `store.enabled = false`, returns NoStore. Otherwise, picks the specified backend.
pub async fn create_store(config: &StoreConfig) -> Arc<dyn Store> {
    if !config.enabled {
        info!("Auth state store is disabled. Using NoStore.");
        return Arc::new(NoStore::new());
    }

    match &config.backend {
        Some(StoreBackend::Memory) => {
            info!("Successfully created in-memory store.");
            Arc::new(MemoryStore::new())
        }
        None => {
            warn!("Store is enabled, but no backend config is provided. Using NoStore.");
            Arc::new(NoStore::new())
        }
    }
}
