//! Local staging area for captured images.
//!
//! Captured faces are written here under a generated unique filename and
//! later either promoted into object storage or deleted. Filenames are
//! validated before any filesystem use; a staged name with path separators
//! or parent references never reaches the disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::{EntradaError, Result};
use crate::naming;

/// Transient on-disk storage for captured images pending promotion.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of a staged file, after validating the filename.
    pub fn path_of(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(EntradaError::NotFound(format!(
                "invalid staged filename '{filename}'"
            )));
        }
        Ok(self.dir.join(filename))
    }

    /// Write a captured image under a fresh unique filename
    /// (`face_<timestamp>_<token>.jpg`) and return that filename.
    /// Uniqueness comes from the timestamp plus random token, not locking.
    pub async fn stage(&self, image: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!(
            "face_{}_{}.jpg",
            naming::timestamp_slug(Utc::now()),
            naming::short_token()
        );
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, image).await?;
        debug!(filename = %filename, bytes = image.len(), "Staged captured image");
        Ok(filename)
    }

    /// Read a staged file. `NotFound` when it does not exist.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_of(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EntradaError::NotFound(
                format!("staged file '{filename}' not found"),
            )),
            Err(e) => Err(EntradaError::Io(e)),
        }
    }

    /// Whether a staged file exists.
    pub async fn contains(&self, filename: &str) -> Result<bool> {
        let path = self.path_of(filename)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EntradaError::Io(e)),
        }
    }

    /// Delete a staged file. `Ok(false)` when it did not exist.
    pub async fn remove(&self, filename: &str) -> Result<bool> {
        let path = self.path_of(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EntradaError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stage_read_remove_roundtrip() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path().join("temp-images"));

        let filename = staging.stage(b"jpeg bytes").await.unwrap();
        assert!(filename.starts_with("face_"));
        assert!(filename.ends_with(".jpg"));

        assert!(staging.contains(&filename).await.unwrap());
        assert_eq!(staging.read(&filename).await.unwrap(), b"jpeg bytes");

        assert!(staging.remove(&filename).await.unwrap());
        assert!(!staging.remove(&filename).await.unwrap());
        assert!(matches!(
            staging.read(&filename).await.unwrap_err(),
            EntradaError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn staged_filenames_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());

        let a = staging.stage(b"a").await.unwrap();
        let b = staging.stage(b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn traversal_filenames_are_rejected() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());

        for bad in ["../escape.jpg", "a/b.jpg", "a\\b.jpg", ""] {
            assert!(staging.path_of(bad).is_err(), "accepted '{bad}'");
        }
    }
}
