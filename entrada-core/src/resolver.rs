//! Storage key resolution.
//!
//! Visit images are stored under the `visitas/` prefix with keys of the form
//! `visitas/<basename>_<timestamp>.jpg` or `visitas/<timestamp>_<token>.jpg`.
//! Callers usually supply only a human name ("ana") or a partial filename;
//! the resolver maps that to a concrete stored key and issues short-lived
//! retrieval URLs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{EntradaError, Result};
use crate::naming;
use crate::storage::ObjectStore;

/// Prefix under which all visit images are stored.
pub const VISIT_IMAGE_PREFIX: &str = "visitas/";

/// Validity of issued retrieval URLs.
pub const RETRIEVAL_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Maps human-supplied image names to stored object keys and issues
/// time-limited retrieval URLs against a swappable [`ObjectStore`].
pub struct StorageKeyResolver {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl StorageKeyResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            prefix: VISIT_IMAGE_PREFIX.to_string(),
        }
    }

    /// Qualify a bare filename with the visit-image prefix. No lookup.
    pub fn qualified_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Compose the permanent key for a promoted image. With a display name
    /// the key is `<name>_<timestamp>.jpg`; without one, a timestamp plus
    /// random token keeps concurrent promotions collision-free.
    pub fn final_key(&self, display_name: Option<&str>, at: DateTime<Utc>) -> String {
        let slug = naming::timestamp_slug(at);
        match display_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{}{}_{}.jpg", self.prefix, name, slug),
            None => format!("{}{}_{}.jpg", self.prefix, slug, naming::short_token()),
        }
    }

    /// Resolve a partial or fully-qualified image name to a stored key.
    ///
    /// A name ending in `.jpg` and containing `_` is already fully
    /// qualified and short-circuits without a listing call. Anything else
    /// is matched as a substring against the `visitas/` listing; the most
    /// recently modified hit wins, with ties broken by key ordering.
    pub async fn resolve_key(&self, name: &str) -> Result<String> {
        if name.ends_with(".jpg") && name.contains('_') {
            return Ok(self.qualified_key(name));
        }

        let objects = self.store.list(&self.prefix).await?;
        debug!(candidates = objects.len(), name, "Resolving image name against listing");
        objects
            .into_iter()
            .filter(|o| o.key.ends_with(".jpg") && o.key.contains(name))
            .max_by(|a, b| {
                a.modified_at
                    .cmp(&b.modified_at)
                    .then_with(|| a.key.cmp(&b.key))
            })
            .map(|o| o.key)
            .ok_or_else(|| EntradaError::NotFound(format!("no image found matching '{name}'")))
    }

    /// Issue a retrieval URL for an existing object. Fails with `NotFound`
    /// when the object does not exist at call time.
    pub async fn retrieval_url(&self, key: &str) -> Result<String> {
        if !self.store.exists(key).await? {
            return Err(EntradaError::NotFound(format!(
                "no image found with key '{key}'"
            )));
        }
        self.store.signed_url(key, RETRIEVAL_URL_TTL).await
    }

    /// Delete a stored object. `Ok(false)` means it did not exist; backend
    /// failures propagate as errors. Both are logged distinctly.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        match self.store.delete(key).await {
            Ok(true) => {
                info!(key, "Deleted stored image");
                Ok(true)
            }
            Ok(false) => {
                warn!(key, "Delete requested for missing object");
                Ok(false)
            }
            Err(e) => {
                warn!(key, error = %e, "Backend error while deleting object");
                Err(e)
            }
        }
    }

    /// Retrieval URLs for every stored image whose key contains `keyword`.
    ///
    /// Scans the entire `visitas/` prefix; O(bucket size). Not for hot paths.
    pub async fn list_by_keyword(&self, keyword: &str) -> Result<Vec<String>> {
        let objects = self.store.list(&self.prefix).await?;
        let mut urls = Vec::new();
        for object in objects.into_iter().filter(|o| o.key.contains(keyword)) {
            urls.push(self.store.signed_url(&object.key, RETRIEVAL_URL_TTL).await?);
        }
        Ok(urls)
    }

    /// Transfer a local file into storage under `key`. Returns the key
    /// unchanged; callers derive the final path, not the resolver.
    pub async fn upload(&self, local_path: &Path, key: &str) -> Result<String> {
        let bytes = match tokio::fs::read(local_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EntradaError::NotFound(format!(
                    "local file '{}' not found",
                    local_path.display()
                )))
            }
            Err(e) => return Err(EntradaError::Io(e)),
        };
        self.store.put(bytes, key).await?;
        info!(key, "Uploaded image to storage");
        Ok(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObjectStore, ObjectInfo};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper that counts listing calls, to assert the fast path.
    struct CountingStore {
        inner: MemoryObjectStore,
        list_calls: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryObjectStore::new(),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<()> {
            self.inner.put(bytes, key).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list(prefix).await
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
            self.inner.signed_url(key, ttl).await
        }
    }

    #[tokio::test]
    async fn qualified_name_short_circuits_listing() {
        let store = Arc::new(CountingStore::new());
        let resolver = StorageKeyResolver::new(store.clone());

        let key = resolver.resolve_key("ana_20240101_120000.jpg").await.unwrap();
        assert_eq!(key, "visitas/ana_20240101_120000.jpg");
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prefix_resolves_to_most_recent_match() {
        let store = Arc::new(MemoryObjectStore::new());
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        store.put_with_modified_at("visitas/ana_20240101_100000.jpg", vec![1], older);
        store.put_with_modified_at("visitas/ana_20240102_100000.jpg", vec![2], newer);
        store.put_with_modified_at("visitas/bob_20240103_100000.jpg", vec![3], newer);

        let resolver = StorageKeyResolver::new(store);
        let key = resolver.resolve_key("ana").await.unwrap();
        assert_eq!(key, "visitas/ana_20240102_100000.jpg");
    }

    #[tokio::test]
    async fn equal_modification_times_tie_break_by_key() {
        let store = Arc::new(MemoryObjectStore::new());
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        store.put_with_modified_at("visitas/ana_a.jpg", vec![1], at);
        store.put_with_modified_at("visitas/ana_b.jpg", vec![2], at);

        let resolver = StorageKeyResolver::new(store);
        // Deterministic for identical timestamps, repeated calls included.
        for _ in 0..3 {
            assert_eq!(resolver.resolve_key("ana").await.unwrap(), "visitas/ana_b.jpg");
        }
    }

    #[tokio::test]
    async fn unresolvable_name_is_not_found() {
        let resolver = StorageKeyResolver::new(Arc::new(MemoryObjectStore::new()));
        let err = resolver.resolve_key("nobody").await.unwrap_err();
        assert!(matches!(err, EntradaError::NotFound(_)));
    }

    #[tokio::test]
    async fn retrieval_url_requires_existing_object() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put(vec![1], "visitas/ana_1.jpg").await.unwrap();
        let resolver = StorageKeyResolver::new(store);

        let url = resolver.retrieval_url("visitas/ana_1.jpg").await.unwrap();
        assert!(url.contains("visitas/ana_1.jpg"));

        let err = resolver.retrieval_url("visitas/gone_1.jpg").await.unwrap_err();
        assert!(matches!(err, EntradaError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_reports_missing_as_false() {
        let resolver = StorageKeyResolver::new(Arc::new(MemoryObjectStore::new()));
        assert!(!resolver.delete("visitas/gone.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn keyword_listing_returns_url_per_hit() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put(vec![1], "visitas/ana_20240101_1.jpg").await.unwrap();
        store.put(vec![2], "visitas/bob_20240101_2.jpg").await.unwrap();
        store.put(vec![3], "visitas/cat_20240202_3.jpg").await.unwrap();

        let resolver = StorageKeyResolver::new(store);
        let urls = resolver.list_by_keyword("20240101").await.unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn final_key_shapes() {
        let resolver = StorageKeyResolver::new(Arc::new(MemoryObjectStore::new()));
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        let named = resolver.final_key(Some("ana"), at);
        assert_eq!(named, "visitas/ana_20240506_070809.jpg");

        let anonymous = resolver.final_key(None, at);
        assert!(anonymous.starts_with("visitas/20240506_070809_"));
        assert!(anonymous.ends_with(".jpg"));

        // Blank display names fall back to the anonymous shape.
        let blank = resolver.final_key(Some("   "), at);
        assert!(blank.starts_with("visitas/20240506_070809_"));
    }

    #[tokio::test]
    async fn upload_missing_local_file_is_not_found() {
        let resolver = StorageKeyResolver::new(Arc::new(MemoryObjectStore::new()));
        let err = resolver
            .upload(Path::new("definitely/not/here.jpg"), "visitas/x_1.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, EntradaError::NotFound(_)));
    }
}
