//! Notification output
//!
//! Newly surfaced records are published as one batch per cycle. The
//! default sink writes a JSON file (atomically, like the state store) for
//! a downstream consumer to pick up; the trait keeps the orchestrator
//! independent of the delivery mechanism.

use crate::error::MonitorError;
use crate::record::TokenRecord;
use crate::store::write_atomic;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationBatch {
    pub generated_at: i64,
    pub time: String,
    pub count: usize,
    pub featured_count: usize,
    /// Records that went through duplicate-cluster scoring.
    pub duplicate_scored_count: usize,
    pub projects: Vec<TokenRecord>,
}

impl NotificationBatch {
    pub fn new(projects: Vec<TokenRecord>, now: i64) -> Self {
        let time = chrono::DateTime::from_timestamp(now, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        Self {
            generated_at: now,
            time,
            count: projects.len(),
            featured_count: projects.iter().filter(|p| p.featured).count(),
            duplicate_scored_count: projects
                .iter()
                .filter(|p| p.trust_score != 0 || p.trust_rank.is_some())
                .count(),
            projects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, batch: &NotificationBatch) -> Result<(), MonitorError>;
}

/// Writes each batch to a fixed path for an external consumer.
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Notifier for FileNotifier {
    async fn publish(&self, batch: &NotificationBatch) -> Result<(), MonitorError> {
        let body = serde_json::to_string_pretty(batch)?;
        write_atomic(&self.path, &body)?;
        log::info!(
            "📢 published {} project(s) ({} featured) to {}",
            batch.count,
            batch.featured_count,
            self.path.display()
        );
        Ok(())
    }
}
