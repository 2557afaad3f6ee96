//! Durable per-address state store
//!
//! Tracks every address that has been surfaced within the observation
//! window, so restarts do not re-announce known assets. Persistence is a
//! single JSON document written atomically (temp file + rename): a crash
//! mid-write leaves the previous snapshot intact, never a truncated one.

use crate::error::MonitorError;
use crate::record::TokenRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    /// When the address was last surfaced in a notification batch.
    pub last_notified_at: i64,
    /// When the honeypot/tax status was last re-checked. 0 = never.
    #[serde(default)]
    pub last_safety_check_at: i64,
    pub record: TokenRecord,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateSnapshot {
    #[serde(default)]
    entries: HashMap<String, StoreEntry>,
}

#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    entries: HashMap<String, StoreEntry>,
}

impl StateStore {
    /// Load the store from disk. A missing file is an empty store, not an
    /// error; a corrupt file is an error so state is never silently lost.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MonitorError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<StateSnapshot>(&contents)?.entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn get(&self, address: &str) -> Option<&StoreEntry> {
        self.entries.get(address)
    }

    pub fn get_mut(&mut self, address: &str) -> Option<&mut StoreEntry> {
        self.entries.get_mut(address)
    }

    /// Insert or replace the tracked record, stamping the notification
    /// time. The safety-check timestamp survives replacement.
    pub fn upsert(&mut self, record: TokenRecord, now: i64) {
        let last_safety_check_at = self
            .entries
            .get(&record.address)
            .map(|e| e.last_safety_check_at)
            .unwrap_or(0);
        self.entries.insert(
            record.address.clone(),
            StoreEntry {
                last_notified_at: now,
                last_safety_check_at,
                record,
            },
        );
    }

    pub fn remove(&mut self, address: &str) -> Option<StoreEntry> {
        self.entries.remove(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StoreEntry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut StoreEntry)> {
        self.entries.iter_mut()
    }

    pub fn records(&self) -> impl Iterator<Item = &TokenRecord> {
        self.entries.values().map(|e| &e.record)
    }

    /// Remove and return every entry whose last notification is older
    /// than the observation window.
    pub fn sweep_expired(&mut self, now: i64, window_secs: i64) -> Vec<StoreEntry> {
        let cutoff = now - window_secs;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.last_notified_at < cutoff)
            .map(|(addr, _)| addr.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|addr| self.entries.remove(&addr))
            .collect()
    }

    pub fn save(&self) -> Result<(), MonitorError> {
        let snapshot = StateSnapshot {
            entries: self.entries.clone(),
        };
        let body = serde_json::to_string_pretty(&snapshot)?;
        write_atomic(&self.path, &body)?;
        Ok(())
    }
}

/// Write `contents` to `path` via a temp file and rename, creating parent
/// directories as needed. Readers never observe a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), MonitorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn make_record(address: &str) -> TokenRecord {
        TokenRecord {
            address: address.to_string(),
            symbol: "TEST".to_string(),
            liquidity: 12_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(make_record("0xaa"), NOW);
        store.upsert(make_record("0xbb"), NOW - 100);
        store.save().unwrap();

        let reloaded = StateStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("0xaa").unwrap().last_notified_at, NOW);
        assert_eq!(reloaded.get("0xbb").unwrap().record.liquidity, 12_000.0);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(make_record("0xaa"), NOW);
        store.save().unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.json");

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(make_record("0xaa"), NOW);
        store.save().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_failed_write_preserves_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(make_record("0xaa"), NOW);
        store.save().unwrap();

        // A write whose temp file cannot land (parent replaced by a file)
        // must not clobber the existing snapshot.
        let blocked = dir.path().join("block").join("state.json");
        fs::write(dir.path().join("block"), "not a directory").unwrap();
        assert!(write_atomic(&blocked, "{}").is_err());

        let reloaded = StateStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_sweep_expired_removes_only_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(dir.path().join("state.json")).unwrap();

        let window = 72 * 3600;
        store.upsert(make_record("0xold"), NOW - 73 * 3600);
        store.upsert(make_record("0xnew"), NOW - 10 * 3600);

        let removed = store.sweep_expired(NOW, window);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].record.address, "0xold");
        assert!(store.contains("0xnew"));
        assert!(!store.contains("0xold"));
    }

    #[test]
    fn test_upsert_preserves_safety_check_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(dir.path().join("state.json")).unwrap();

        store.upsert(make_record("0xaa"), NOW - 3600);
        store.get_mut("0xaa").unwrap().last_safety_check_at = NOW - 1800;

        store.upsert(make_record("0xaa"), NOW);
        let entry = store.get("0xaa").unwrap();
        assert_eq!(entry.last_notified_at, NOW);
        assert_eq!(entry.last_safety_check_at, NOW - 1800);
    }
}
