use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;

/// An in-process store, the default backend. The browser-storage analog of
/// the original environment; hosts with real persistence plug in their own
/// `Store` implementation.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn key(item: &str, config_id: &str) -> (String, String) {
        (config_id.to_string(), item.to_string())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read(&self, item: &str, config_id: &str) -> Result<Option<String>, String> {
        let items = self.items.read().await;
        Ok(items.get(&Self::key(item, config_id)).cloned())
    }

    async fn write(&self, item: &str, config_id: &str, value: &str) -> Result<(), String> {
        let mut items = self.items.write().await;
        items.insert(Self::key(item, config_id), value.to_string());
        Ok(())
    }

    async fn remove(&self, item: &str, config_id: &str) -> Result<(), String> {
        let mut items = self.items.write().await;
        items.remove(&Self::key(item, config_id));
        Ok(())
    }

    async fn clear(&self, config_id: &str) -> Result<(), String> {
        let mut items = self.items.write().await;
        items.retain(|(stored_config, _), _| stored_config != config_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_remove() {
        let store = MemoryStore::new();
        store.write("access_token", "a", "token-value").await.unwrap();

        assert_eq!(
            store.read("access_token", "a").await.unwrap(),
            Some("token-value".to_string())
        );

        store.remove("access_token", "a").await.unwrap();
        assert_eq!(store.read("access_token", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_config_ids_do_not_collide() {
        let store = MemoryStore::new();
        store.write("auth_nonce", "a", "nonce-a").await.unwrap();
        store.write("auth_nonce", "b", "nonce-b").await.unwrap();

        assert_eq!(
            store.read("auth_nonce", "a").await.unwrap(),
            Some("nonce-a".to_string())
        );
        assert_eq!(
            store.read("auth_nonce", "b").await.unwrap(),
            Some("nonce-b".to_string())
        );
    }

    #[tokio::test]
    async fn test_clear_only_touches_one_config() {
        let store = MemoryStore::new();
        store.write("id_token", "a", "token-a").await.unwrap();
        store.write("id_token", "b", "token-b").await.unwrap();

        store.clear("a").await.unwrap();

        assert_eq!(store.read("id_token", "a").await.unwrap(), None);
        assert_eq!(
            store.read("id_token", "b").await.unwrap(),
            Some("token-b".to_string())
        );
    }
}
