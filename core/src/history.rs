//! Update history persistence
//!
//! A rolling JSON record of the last 100 retry-wrapped runs, plus the
//! derived statistics the `status` command shows.

use crate::retry::RetryOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub attempts: u32,
    #[serde(default)]
    pub operations: BTreeMap<String, String>,
}

impl HistoryEntry {
    pub fn from_outcome(outcome: &RetryOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            success: outcome.succeeded,
            attempts: outcome.attempts,
            operations: outcome
                .report
                .as_ref()
                .map(|r| r.operation_details())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub last: Option<HistoryEntry>,
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history file: {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse history file: {:?}", self.path))
    }

    /// Append one entry, keeping only the most recent records
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut entries = self.load().unwrap_or_default();
        entries.push(entry.clone());
        let overflow = entries.len().saturating_sub(MAX_ENTRIES);
        entries.drain(..overflow);

        let content =
            serde_json::to_string_pretty(&entries).context("Failed to serialize history")?;
        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write history file: {:?}", self.path))
    }

    pub fn stats(&self) -> Option<HistoryStats> {
        let entries = self.load().ok()?;
        if entries.is_empty() {
            return None;
        }

        let total = entries.len();
        let successful = entries.iter().filter(|e| e.success).count();
        Some(HistoryStats {
            total,
            successful,
            failed: total - successful,
            success_rate: successful as f64 / total as f64 * 100.0,
            last: entries.last().cloned(),
        })
    }
}

fn atomic_write(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .context("Destination path has no parent directory")?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent dir: {:?}", parent))?;

    let tmp = dest.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write temp file: {:?}", tmp))?;

    // Best-effort cleanup on failure.
    if let Err(rename_err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(rename_err).context("Failed to rename temp file into place");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(success: bool) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            success,
            attempts: 1,
            operations: BTreeMap::new(),
        }
    }

    #[test]
    fn append_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.json"));

        store.append(&entry(true)).expect("append");
        store.append(&entry(false)).expect("append");

        let entries = store.load().expect("load");
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert!(!entries[1].success);
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().expect("load").is_empty());
        assert!(store.stats().is_none());
    }

    #[test]
    fn history_is_capped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.json"));

        for i in 0..MAX_ENTRIES + 5 {
            store.append(&entry(i % 2 == 0)).expect("append");
        }

        let entries = store.load().expect("load");
        assert_eq!(entries.len(), MAX_ENTRIES);
    }

    #[test]
    fn stats_reflect_the_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.json"));

        store.append(&entry(true)).expect("append");
        store.append(&entry(true)).expect("append");
        store.append(&entry(false)).expect("append");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert!((stats.success_rate - 66.6).abs() < 1.0);
        assert!(!stats.last.expect("last").success);
    }
}
