use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A wrapper for the store configuration:
/// - enabled: if false, the store is effectively disabled (NoStore).
/// - backend: the actual store backend (in-memory, etc.).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct StoreConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub backend: Option<StoreBackend>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            enabled: true,
            backend: Some(StoreBackend::Memory),
        }
    }
}

/// The built-in store backends. We differentiate them via a "type" tag in the YAML.
/// Custom backends bypass this enum: hand your own `Arc<dyn Store>` to the
/// composition root instead.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "memory")]
    Memory,
    // Add more variants here as needed, like:
    // #[serde(rename = "awesome")]
    // AwesomeStore(AwesomeStoreConfig),
}
