//! In-memory persistence (non-persistent).

use super::Persistence;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blobs: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn load(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), String> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_replaces_previous_blob() {
        let store = InMemoryPersistence::new();
        store.save("k", "one").await.unwrap();
        store.save("k", "two").await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.load("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = InMemoryPersistence::new();
        let clone = store.clone();
        store.save("k", "shared").await.unwrap();
        assert_eq!(clone.load("k").await.unwrap().as_deref(), Some("shared"));
    }
}
