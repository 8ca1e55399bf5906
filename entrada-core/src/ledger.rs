//! Append-only visit ledger persisted as a single JSON document.
//!
//! The ledger is the system's only durable record of who entered and when.
//! Every mutation is a full-document read-modify-write, so all mutations go
//! through an internal async mutex held for the whole load-mutate-persist
//! cycle, and the document is replaced by temp-file rename. Reads take a
//! snapshot via [`VisitLedger::load_all`] without locking and never observe
//! a write's partial state.
//!
//! An absent backing file reads as an empty ledger. A file that exists but
//! fails to parse is a fatal [`EntradaError::LedgerCorrupt`] and is never
//! silently treated as empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{EntradaError, Result};

/// One visit event. Immutable once appended; corrections are remove+append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Stable recognition-service identifier for the face.
    pub identity_id: String,
    /// Opaque label assigned at enrollment, propagated verbatim on matches.
    pub external_id: String,
    pub timestamp: DateTime<Utc>,
}

impl VisitRecord {
    pub fn new(
        identity_id: impl Into<String>,
        external_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            identity_id: identity_id.into(),
            external_id: external_id.into(),
            timestamp,
        }
    }

    fn matches_identity(&self, identity_id: &str, external_id: &str) -> bool {
        self.identity_id == identity_id && self.external_id == external_id
    }
}

/// Per-identity visit count for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitGroup {
    pub identity_id: String,
    pub external_id: String,
    pub visit_count: usize,
}

/// File-backed ledger of [`VisitRecord`]s, insertion order = append order.
pub struct VisitLedger {
    path: PathBuf,
    /// Serializes every load-mutate-persist cycle. Concurrent appends racing
    /// on the same document would otherwise lose updates.
    write_lock: Mutex<()>,
}

impl VisitLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full record sequence. Absent file yields an empty sequence.
    pub async fn load_all(&self) -> Result<Vec<VisitRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EntradaError::Io(e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            EntradaError::LedgerCorrupt(format!(
                "failed to parse ledger document at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn persist(&self, records: &[VisitRecord]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| EntradaError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        // Write a sibling temp file and rename it over the document, so a
        // concurrent reader sees either the previous or the new contents but
        // never a truncated file. Writers all hold the mutex, so the fixed
        // temp name cannot collide.
        let tmp = {
            let mut name = self.path.as_os_str().to_owned();
            name.push(".tmp");
            PathBuf::from(name)
        };
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Append a record, preserving all prior records and their order.
    pub async fn append(&self, record: VisitRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_all().await?;
        tracing::debug!(
            identity_id = %record.identity_id,
            external_id = %record.external_id,
            total = records.len() + 1,
            "Appending visit record"
        );
        records.push(record);
        self.persist(&records).await
    }

    /// Remove the most recently appended record, if any.
    pub async fn remove_last(&self) -> Result<Option<VisitRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_all().await?;
        let removed = records.pop();
        if removed.is_some() {
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    /// Remove every record matching `predicate`, returning how many were
    /// removed. A predicate that always matches wipes the ledger.
    pub async fn remove_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&VisitRecord) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let records = self.load_all().await?;
        let before = records.len();
        let kept: Vec<VisitRecord> = records.into_iter().filter(|r| !predicate(r)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.persist(&kept).await?;
        }
        Ok(removed)
    }

    /// Remove every record whose timestamp falls on the given calendar date.
    pub async fn remove_on_date(&self, date: NaiveDate) -> Result<usize> {
        self.remove_where(|r| r.timestamp.date_naive() == date).await
    }

    /// Count records matching `(identity_id, external_id)` exactly, with
    /// `timestamp >= since`.
    pub async fn count_since(
        &self,
        identity_id: &str,
        external_id: &str,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        let records = self.load_all().await?;
        Ok(records
            .iter()
            .filter(|r| r.matches_identity(identity_id, external_id) && r.timestamp >= since)
            .count())
    }

    /// Whether any record matches `(identity_id, external_id)` with
    /// `timestamp >= since`.
    pub async fn any_since(
        &self,
        identity_id: &str,
        external_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let records = self.load_all().await?;
        Ok(records
            .iter()
            .any(|r| r.matches_identity(identity_id, external_id) && r.timestamp >= since))
    }

    /// Partition the given date's records by `(identity_id, external_id)`
    /// and count per group. Group order is deterministic within one call.
    pub async fn group_by_identity_on_date(&self, date: NaiveDate) -> Result<Vec<VisitGroup>> {
        let records = self.load_all().await?;
        let mut groups: BTreeMap<(String, String), usize> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.timestamp.date_naive() == date)
        {
            *groups
                .entry((record.identity_id.clone(), record.external_id.clone()))
                .or_insert(0) += 1;
        }
        Ok(groups
            .into_iter()
            .map(|((identity_id, external_id), visit_count)| VisitGroup {
                identity_id,
                external_id,
                visit_count,
            })
            .collect())
    }
}
