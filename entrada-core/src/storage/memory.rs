//! In-memory object store for development and tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{expiry_timestamp, ObjectInfo, ObjectStore};
use crate::error::Result;

struct StoredObject {
    bytes: Vec<u8>,
    modified_at: DateTime<Utc>,
}

/// Object store backed by a concurrent map. Contents are lost on restart.
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
    base_url: String,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            base_url: "http://storage.local".to_string(),
        }
    }

    /// Insert an object with an explicit modification time. Test seam for
    /// listing-order assertions.
    pub fn put_with_modified_at(&self, key: &str, bytes: Vec<u8>, modified_at: DateTime<Utc>) {
        self.objects.insert(
            key.to_string(),
            StoredObject { bytes, modified_at },
        );
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Raw bytes of a stored object, if present.
    pub fn bytes_of(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.get(key).map(|o| o.bytes.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<()> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                modified_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut infos: Vec<ObjectInfo> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| ObjectInfo {
                key: entry.key().clone(),
                modified_at: entry.value().modified_at,
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.objects.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(format!(
            "{}/{}?expires={}",
            self.base_url,
            key,
            expiry_timestamp(ttl)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_list_delete_roundtrip() {
        let store = MemoryObjectStore::new();
        store.put(vec![1], "visitas/a_1.jpg").await.unwrap();
        store.put(vec![2], "visitas/b_2.jpg").await.unwrap();
        store.put(vec![3], "other/c_3.jpg").await.unwrap();

        let listed = store.list("visitas/").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|o| o.key.starts_with("visitas/")));

        assert!(store.delete("visitas/a_1.jpg").await.unwrap());
        assert!(!store.delete("visitas/a_1.jpg").await.unwrap());
        assert!(!store.exists("visitas/a_1.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn default_store_signs_urls_like_new() {
        let store = MemoryObjectStore::default();
        store.put(vec![1], "visitas/a_1.jpg").await.unwrap();
        let url = store
            .signed_url("visitas/a_1.jpg", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("http://storage.local/"));
    }

    #[tokio::test]
    async fn signed_url_embeds_key_and_expiry() {
        let store = MemoryObjectStore::new();
        store.put(vec![1], "visitas/a_1.jpg").await.unwrap();
        let url = store
            .signed_url("visitas/a_1.jpg", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.contains("visitas/a_1.jpg"));
        assert!(url.contains("expires="));
    }
}
