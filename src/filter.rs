//! Quality filter over merged records
//!
//! Pure predicate: a record is kept only if every condition passes.
//! Holder counts of 0 mean the provider did not report them and are
//! not penalized.

use crate::config::MonitorConfig;
use crate::record::TokenRecord;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct QualityFilter {
    denylist: HashSet<String>,
    max_age_hours: f64,
    min_liquidity: f64,
    min_holders: i64,
}

impl QualityFilter {
    pub fn new(
        denylist: impl IntoIterator<Item = String>,
        max_age_hours: f64,
        min_liquidity: f64,
        min_holders: i64,
    ) -> Self {
        Self {
            denylist: denylist.into_iter().map(|s| s.to_lowercase()).collect(),
            max_age_hours,
            min_liquidity,
            min_holders,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.denylist.iter().cloned(),
            config.max_age_hours,
            config.min_liquidity,
            config.min_holders,
        )
    }

    /// All conditions ANDed.
    pub fn passes(&self, record: &TokenRecord, now: i64) -> bool {
        if self.denylist.contains(&record.symbol.to_lowercase()) {
            return false;
        }
        if record.age_hours_at(now) > self.max_age_hours {
            return false;
        }
        if record.liquidity < self.min_liquidity {
            return false;
        }
        if record.holders > 0 && record.holders < self.min_holders {
            return false;
        }
        true
    }

    pub fn apply(&self, records: Vec<TokenRecord>, now: i64) -> Vec<TokenRecord> {
        records
            .into_iter()
            .filter(|r| self.passes(r, now))
            .collect()
    }
}
