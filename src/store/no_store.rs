use async_trait::async_trait;

use super::Store;

/// A no-op store that always returns an error if written to,
/// indicating the store is disabled.
pub struct NoStore;

impl NoStore {
    pub fn new() -> Self {
        NoStore
    }
}

impl Default for NoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for NoStore {
    async fn read(&self, _item: &str, _config_id: &str) -> Result<Option<String>, String> {
        Ok(None)
    }

    async fn write(&self, _item: &str, _config_id: &str, _value: &str) -> Result<(), String> {
        Err("Auth state store is disabled".into())
    }

    async fn remove(&self, _item: &str, _config_id: &str) -> Result<(), String> {
        Err("Auth state store is disabled".into())
    }

    async fn clear(&self, _config_id: &str) -> Result<(), String> {
        Err("Auth state store is disabled".into())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads behave like an empty store so auth checks resolve
    /// unauthenticated instead of erroring.
    #[tokio::test]
    async fn test_no_store_read_is_empty() {
        let no_store = NoStore::new();
        let res = no_store.read("access_token", "a").await;
        assert_eq!(res.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_store_write_fails() {
        let no_store = NoStore::new();
        let res = no_store.write("access_token", "a", "value").await;
        assert!(res.is_err(), "Expected write to return an error");
    }

    #[tokio::test]
    async fn test_no_store_is_disabled() {
        assert!(!NoStore::new().is_enabled());
    }
}
