//! Filesystem object store.
//!
//! Objects live under a root directory with the key as the relative path.
//! Retrieval URLs are formed from a public base URL with an expiry query
//! parameter, the way a fronting file server or CDN would serve them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{expiry_timestamp, ObjectInfo, ObjectStore};
use crate::error::{EntradaError, Result};

/// Object store rooted at a local directory.
pub struct FsObjectStore {
    root: PathBuf,
    public_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(EntradaError::Storage(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        // Keys are flat under one directory level, so a prefix splits into
        // the directory to scan and a leading filename fragment.
        let (dir, name_prefix) = match prefix.rsplit_once('/') {
            Some((dir, rest)) => (self.root.join(dir), rest.to_string()),
            None => (self.root.clone(), prefix.to_string()),
        };
        let key_dir = prefix
            .rsplit_once('/')
            .map(|(dir, _)| format!("{dir}/"))
            .unwrap_or_default();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EntradaError::Io(e)),
        };

        let mut infos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&name_prefix) {
                continue;
            }
            let modified_at: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            infos.push(ObjectInfo {
                key: format!("{key_dir}{name}"),
                modified_at,
            });
        }
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EntradaError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.object_path(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EntradaError::Io(e)),
        }
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(format!(
            "{}/{}?expires={}",
            self.public_url,
            key,
            expiry_timestamp(ttl)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FsObjectStore {
        FsObjectStore::new(dir.path(), "http://files.local")
    }

    #[tokio::test]
    async fn put_then_list_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.put(vec![1, 2], "visitas/ana_1.jpg").await.unwrap();
        store.put(vec![3], "visitas/bob_2.jpg").await.unwrap();

        let listed = store.list("visitas/").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, "visitas/ana_1.jpg");

        assert!(store.exists("visitas/ana_1.jpg").await.unwrap());
        assert!(store.delete("visitas/ana_1.jpg").await.unwrap());
        assert!(!store.delete("visitas/ana_1.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn listing_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list("visitas/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let err = store.put(vec![1], "visitas/../escape.jpg").await.unwrap_err();
        assert!(matches!(err, EntradaError::Storage(_)));
    }

    #[tokio::test]
    async fn name_prefix_filters_listing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.put(vec![1], "visitas/ana_1.jpg").await.unwrap();
        store.put(vec![2], "visitas/bob_2.jpg").await.unwrap();

        let listed = store.list("visitas/ana").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "visitas/ana_1.jpg");
    }
}
