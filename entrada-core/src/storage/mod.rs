//! Object storage backends.
//!
//! A single capability trait covers everything the resolver needs from
//! durable object storage: bytes in, listings with modification times,
//! existence checks, deletes, and time-limited retrieval URLs. Backends are
//! interchangeable and selected at startup:
//!
//! - [`FsObjectStore`] keeps objects under a local root directory and forms
//!   URLs from a public base URL (production when fronted by a file server).
//! - [`MemoryObjectStore`] is the development and test fallback; contents
//!   are lost on restart.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// One stored object as seen in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub modified_at: DateTime<Utc>,
}

/// Durable bytes-in/URL-out storage. Deliberately narrow; anything richer
/// belongs to the backend service, not this crate.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<()>;

    /// List all objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Delete the object. `Ok(false)` means it did not exist; errors are
    /// reserved for backend failures.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Issue a retrieval URL valid for `ttl`. Existence is not checked here;
    /// callers that need the distinction check first.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String>;
}

/// Select an object-store backend from the environment.
///
/// `OBJECT_STORE=fs` uses [`FsObjectStore`] rooted at `OBJECT_STORE_ROOT`
/// (default `object-store`) with URLs under `OBJECT_STORE_PUBLIC_URL`.
/// Anything else falls back to the in-memory store with a warning.
pub fn store_from_env() -> Arc<dyn ObjectStore> {
    match std::env::var("OBJECT_STORE").as_deref() {
        Ok("fs") => {
            let root = std::env::var("OBJECT_STORE_ROOT")
                .unwrap_or_else(|_| "object-store".to_string());
            let public_url = std::env::var("OBJECT_STORE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000/objects".to_string());
            tracing::info!(root = %root, "Using filesystem object store");
            Arc::new(FsObjectStore::new(root, public_url))
        }
        _ => {
            tracing::warn!("OBJECT_STORE not set, using in-memory store - objects will be lost on restart!");
            Arc::new(MemoryObjectStore::new())
        }
    }
}

/// Compute the expiry instant encoded into signed URLs.
pub(crate) fn expiry_timestamp(ttl: Duration) -> i64 {
    (Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)))
        .timestamp()
}
