//! Archival and state lifecycle
//!
//! Entries that age out of the observation window move from the live
//! store into a date-bucketed archive keyed by listing date, with a
//! derived per-day index for quick inspection. Separately, cleanup drops
//! low-confidence noise from the live store: scored-out duplicates and
//! stale illiquid assets nobody is talking about.

use crate::error::MonitorError;
use crate::record::{TokenRecord, TrustRank};
use crate::store::{write_atomic, StateStore, StoreEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

/// Bucket key for records whose listing time was never resolved.
pub const UNKNOWN_DATE: &str = "unknown";

const CLEANUP_COUNTERFEIT_MIN_AGE_HOURS: f64 = 48.0;
const CLEANUP_ILLIQUID_MIN_AGE_HOURS: f64 = 24.0;
const CLEANUP_ILLIQUID_MAX_LIQUIDITY: f64 = 10_000.0;

/// Date-bucketed archive of expired records plus its derived index.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    index_path: PathBuf,
    days: BTreeMap<String, Vec<TokenRecord>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArchiveSnapshot {
    #[serde(default)]
    days: BTreeMap<String, Vec<TokenRecord>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    pub count: usize,
    pub featured: usize,
    /// First few symbols for the day, newest archive order.
    pub symbols: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub updated_at: i64,
    pub total: usize,
    pub days: Vec<DaySummary>,
}

impl Archive {
    pub fn load(
        path: impl Into<PathBuf>,
        index_path: impl Into<PathBuf>,
    ) -> Result<Self, MonitorError> {
        let path = path.into();
        let days = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<ArchiveSnapshot>(&contents)?.days,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            index_path: index_path.into(),
            days,
        })
    }

    /// Archive one record under its listing date. Returns false if the
    /// address is already archived anywhere, so re-archiving is a no-op.
    pub fn insert(&mut self, record: TokenRecord) -> bool {
        if record.address.is_empty() || self.contains(&record.address) {
            return false;
        }
        self.days
            .entry(bucket_for(&record))
            .or_default()
            .push(record);
        true
    }

    pub fn contains(&self, address: &str) -> bool {
        self.days
            .values()
            .any(|records| records.iter().any(|r| r.address == address))
    }

    pub fn total(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Persist the archive and regenerate the index, both atomically.
    pub fn save(&self, now: i64) -> Result<(), MonitorError> {
        let snapshot = ArchiveSnapshot {
            days: self.days.clone(),
        };
        write_atomic(&self.path, &serde_json::to_string_pretty(&snapshot)?)?;

        let index = self.build_index(now);
        write_atomic(&self.index_path, &serde_json::to_string_pretty(&index)?)?;
        Ok(())
    }

    fn build_index(&self, now: i64) -> ArchiveIndex {
        let days = self
            .days
            .iter()
            .rev()
            .map(|(date, records)| DaySummary {
                date: date.clone(),
                count: records.len(),
                featured: records.iter().filter(|r| r.featured).count(),
                symbols: records.iter().take(8).map(|r| r.symbol.clone()).collect(),
            })
            .collect();
        ArchiveIndex {
            updated_at: now,
            total: self.total(),
            days,
        }
    }
}

fn bucket_for(record: &TokenRecord) -> String {
    if !record.has_valid_open_timestamp() {
        return UNKNOWN_DATE.to_string();
    }
    match chrono::DateTime::from_timestamp(record.open_timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Remove low-confidence noise from the live store. Two independent rules:
///
/// (a) in a duplicate-symbol cluster, drop records ranked likely
///     counterfeit whose score is at or below one third of the cluster's
///     current top score, once they are older than 48h;
/// (b) drop records with under $10k liquidity, older than 24h, carrying
///     no social link and no featured tag.
///
/// Cluster maxima are recomputed from current membership, which may
/// differ from the membership at scoring time if peers expired since.
pub fn cleanup_low_confidence(store: &mut StateStore, now: i64) -> Vec<StoreEntry> {
    let mut clusters: HashMap<String, Vec<(String, i32, f64, Option<TrustRank>)>> = HashMap::new();
    for (addr, entry) in store.iter() {
        clusters
            .entry(entry.record.symbol.to_uppercase())
            .or_default()
            .push((
                addr.clone(),
                entry.record.trust_score,
                entry.record.age_hours_at(now),
                entry.record.trust_rank,
            ));
    }

    let mut doomed: HashSet<String> = HashSet::new();

    for members in clusters.values() {
        if members.len() < 2 {
            continue;
        }
        let max_score = members.iter().map(|(_, s, _, _)| *s).max().unwrap_or(0);
        if max_score == 0 {
            continue;
        }
        for (addr, score, age, rank) in members {
            if *rank == Some(TrustRank::LikelyCounterfeit)
                && (*score as f64) <= (max_score as f64) / 3.0
                && *age > CLEANUP_COUNTERFEIT_MIN_AGE_HOURS
            {
                doomed.insert(addr.clone());
            }
        }
    }

    for (addr, entry) in store.iter() {
        let r = &entry.record;
        if r.liquidity < CLEANUP_ILLIQUID_MAX_LIQUIDITY
            && r.age_hours_at(now) > CLEANUP_ILLIQUID_MIN_AGE_HOURS
            && !r.has_social()
            && !r.featured
        {
            doomed.insert(addr.clone());
        }
    }

    doomed
        .into_iter()
        .filter_map(|addr| store.remove(&addr))
        .collect()
}

#[derive(Debug, Default)]
pub struct LifecycleReport {
    pub expired: usize,
    pub archived: usize,
    pub cleaned: usize,
}

/// Expire, archive, and clean in one pass. The caller persists the store
/// afterwards; the archive is saved here so expired records are on disk
/// before they disappear from live state.
pub fn run_lifecycle(
    store: &mut StateStore,
    archive: &mut Archive,
    observation_window_secs: i64,
    now: i64,
) -> Result<LifecycleReport, MonitorError> {
    let mut report = LifecycleReport::default();

    let expired = store.sweep_expired(now, observation_window_secs);
    report.expired = expired.len();
    for entry in expired {
        if archive.insert(entry.record) {
            report.archived += 1;
        }
    }
    if report.expired > 0 {
        archive.save(now)?;
    }

    report.cleaned = cleanup_low_confidence(store, now).len();
    Ok(report)
}
