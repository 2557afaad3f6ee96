//! Canonical token record shared by every pipeline stage
//!
//! One `TokenRecord` per discovery event before merge, exactly one per
//! address after merge. Every field has a documented default so "unknown"
//! is always a typed value, never an absent key.

use serde::{Deserialize, Serialize};

/// Timestamps below this are treated as unknown (garbage values like 0 or
/// millisecond/second confusion from upstream providers).
pub const MIN_VALID_TIMESTAMP: i64 = 1_000_000_000;

/// Tri-state flag for safety signals providers may not report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    #[default]
    Unknown,
    No,
    Yes,
}

impl TriState {
    pub fn is_yes(self) -> bool {
        matches!(self, TriState::Yes)
    }

    pub fn is_known(self) -> bool {
        !matches!(self, TriState::Unknown)
    }

    /// Coerce a provider flag (0/1, true/false) into a tri-state.
    pub fn from_flag(flag: Option<i64>) -> Self {
        match flag {
            Some(0) => TriState::No,
            Some(_) => TriState::Yes,
            None => TriState::Unknown,
        }
    }
}

/// Which provider produced a record instance. Ordering is by trust:
/// higher priority wins during merge, lower-priority sources only backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    GmgnRank,
    GmgnPairs,
    DexScreener,
}

impl Source {
    pub fn priority(self) -> u8 {
        match self {
            Source::GmgnRank => 3,
            Source::GmgnPairs => 2,
            Source::DexScreener => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::GmgnRank => "gmgn_rank",
            Source::GmgnPairs => "gmgn_pairs",
            Source::DexScreener => "dexscreener",
        }
    }
}

/// Categorical verdict for a record inside a duplicate-name cluster.
///
/// Singleton clusters never receive a rank, only a raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustRank {
    Verified,
    NeedsReview,
    LikelyCounterfeit,
}

impl TrustRank {
    pub fn label(self) -> &'static str {
        match self {
            TrustRank::Verified => "verified",
            TrustRank::NeedsReview => "needs review",
            TrustRank::LikelyCounterfeit => "likely counterfeit",
        }
    }
}

/// Canonical asset record.
///
/// `address` is the primary key after merge and immutable once assigned.
/// Numeric fields default to 0 when a provider does not report them;
/// `holders == 0` means "unknown", not "zero holders".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRecord {
    pub address: String,
    pub symbol: String,
    pub price: f64,
    pub market_cap: f64,
    pub liquidity: f64,
    pub volume_1h: f64,
    pub swaps: i64,
    pub buys: i64,
    pub sells: i64,
    pub holders: i64,
    pub price_change_1h: f64,
    /// Epoch seconds the asset began trading; 0 means unknown.
    pub open_timestamp: i64,
    /// Derived cache of (now - open_timestamp) / 3600, refreshed on use.
    pub age_hours: f64,
    pub website: String,
    pub twitter: String,
    pub telegram: String,
    pub is_honeypot: TriState,
    pub buy_tax: Option<f64>,
    pub sell_tax: Option<f64>,
    pub renounced: TriState,
    pub smart_buy_24h: i64,
    pub smart_sell_24h: i64,
    pub source: Source,
    /// Matched a configured featured keyword (symbol or social links).
    pub featured: bool,
    pub featured_keywords: Vec<String>,
    /// Set by the scoring engine when buy/sell flow looks like a honeypot.
    pub suspect_honeypot: bool,
    pub trust_score: i32,
    pub trust_rank: Option<TrustRank>,
}

impl Default for TokenRecord {
    fn default() -> Self {
        Self {
            address: String::new(),
            symbol: String::new(),
            price: 0.0,
            market_cap: 0.0,
            liquidity: 0.0,
            volume_1h: 0.0,
            swaps: 0,
            buys: 0,
            sells: 0,
            holders: 0,
            price_change_1h: 0.0,
            open_timestamp: 0,
            age_hours: 0.0,
            website: String::new(),
            twitter: String::new(),
            telegram: String::new(),
            is_honeypot: TriState::Unknown,
            buy_tax: None,
            sell_tax: None,
            renounced: TriState::Unknown,
            smart_buy_24h: 0,
            smart_sell_24h: 0,
            source: Source::DexScreener,
            featured: false,
            featured_keywords: Vec::new(),
            suspect_honeypot: false,
            trust_score: 0,
            trust_rank: None,
        }
    }
}

impl TokenRecord {
    pub fn has_social(&self) -> bool {
        !self.website.is_empty() || !self.twitter.is_empty()
    }

    pub fn has_valid_open_timestamp(&self) -> bool {
        self.open_timestamp >= MIN_VALID_TIMESTAMP
    }

    /// Age in hours at `now`, recomputed from `open_timestamp` when known,
    /// falling back to the cached value otherwise.
    pub fn age_hours_at(&self, now: i64) -> f64 {
        if self.has_valid_open_timestamp() {
            (now - self.open_timestamp) as f64 / 3600.0
        } else {
            self.age_hours
        }
    }

    /// Refresh the cached `age_hours` from `open_timestamp`.
    pub fn refresh_age(&mut self, now: i64) {
        if self.has_valid_open_timestamp() {
            self.age_hours = (now - self.open_timestamp) as f64 / 3600.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tristate_from_flag() {
        assert_eq!(TriState::from_flag(Some(1)), TriState::Yes);
        assert_eq!(TriState::from_flag(Some(0)), TriState::No);
        assert_eq!(TriState::from_flag(None), TriState::Unknown);
    }

    #[test]
    fn test_source_priority_order() {
        assert!(Source::GmgnRank.priority() > Source::GmgnPairs.priority());
        assert!(Source::GmgnPairs.priority() > Source::DexScreener.priority());
    }

    #[test]
    fn test_age_recompute_prefers_open_timestamp() {
        let mut record = TokenRecord {
            open_timestamp: 1_700_000_000,
            age_hours: 99.0,
            ..Default::default()
        };
        let now = 1_700_000_000 + 7200;
        assert_eq!(record.age_hours_at(now), 2.0);
        record.refresh_age(now);
        assert_eq!(record.age_hours, 2.0);
    }

    #[test]
    fn test_age_falls_back_to_cache_when_unknown() {
        let record = TokenRecord {
            open_timestamp: 0,
            age_hours: 5.5,
            ..Default::default()
        };
        assert_eq!(record.age_hours_at(1_700_000_000), 5.5);
    }

    #[test]
    fn test_serde_defaults_tolerate_missing_fields() {
        // Older persisted snapshots may not carry newer fields.
        let record: TokenRecord =
            serde_json::from_str(r#"{"address":"0xab","symbol":"FOO","source":"gmgn_rank"}"#)
                .unwrap();
        assert_eq!(record.address, "0xab");
        assert_eq!(record.is_honeypot, TriState::Unknown);
        assert_eq!(record.trust_rank, None);
        assert!(!record.featured);
    }
}
