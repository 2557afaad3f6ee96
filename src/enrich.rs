//! Freshness and safety lookup collaborators
//!
//! Supplementary, budget-bounded lookups used to resolve unknown listing
//! timestamps and to re-check honeypot/tax status. Absence or failure is
//! always "still unknown", never a fatal error: callers consume the
//! `Result` and degrade per the orchestrator's rules.

use crate::error::MonitorError;
use crate::normalizer::normalize_epoch_seconds;
use crate::record::TriState;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Latest market snapshot for a single address.
#[derive(Debug, Clone, Default)]
pub struct LatestQuote {
    pub price: f64,
    pub market_cap: f64,
    pub liquidity: f64,
    pub volume_1h: f64,
    pub buys: i64,
    pub sells: i64,
    pub price_change_1h: f64,
}

/// Honeypot/tax check result.
#[derive(Debug, Clone)]
pub struct SafetyReport {
    pub is_honeypot: TriState,
    pub buy_tax: Option<f64>,
    pub sell_tax: Option<f64>,
}

#[async_trait]
pub trait FreshnessSource: Send + Sync {
    /// Earliest known pool-creation time for the address, epoch seconds.
    async fn earliest_creation(&self, address: &str) -> Result<Option<i64>, MonitorError>;

    /// Current market data for the address, if any pool is live.
    async fn latest_quote(&self, address: &str) -> Result<Option<LatestQuote>, MonitorError>;
}

#[async_trait]
pub trait SafetyChecker: Send + Sync {
    async fn check(&self, address: &str) -> Result<Option<SafetyReport>, MonitorError>;
}

/// Fixed per-cycle call budget for external lookups.
///
/// A counter, not a rate limiter: it caps worst-case cycle duration and
/// exhaustion degrades gracefully instead of blocking.
#[derive(Debug)]
pub struct LookupBudget {
    remaining: u32,
}

impl LookupBudget {
    pub fn new(limit: u32) -> Self {
        Self { remaining: limit }
    }

    /// Take one call from the budget; false when exhausted.
    pub fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

// ---------------------------------------------------------------------------
// DexScreener-backed freshness source
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Vec<TokenPair>,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    #[serde(rename = "pairCreatedAt", default)]
    pair_created_at: i64,
    #[serde(rename = "priceUsd", default)]
    price_usd: String,
    #[serde(rename = "marketCap", default)]
    market_cap: f64,
    #[serde(default)]
    liquidity: Option<PairLiquidity>,
    #[serde(default)]
    volume: Option<PairWindowed>,
    #[serde(rename = "priceChange", default)]
    price_change: Option<PairWindowed>,
    #[serde(default)]
    txns: Option<PairTxns>,
}

#[derive(Debug, Deserialize)]
struct PairLiquidity {
    #[serde(default)]
    usd: f64,
}

#[derive(Debug, Deserialize)]
struct PairWindowed {
    #[serde(default)]
    h1: f64,
}

#[derive(Debug, Deserialize)]
struct PairTxns {
    #[serde(default)]
    h1: Option<PairTxnCounts>,
}

#[derive(Debug, Deserialize, Default)]
struct PairTxnCounts {
    #[serde(default)]
    buys: i64,
    #[serde(default)]
    sells: i64,
}

pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new() -> Result<Self, MonitorError> {
        Self::with_base_url("https://api.dexscreener.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url })
    }

    async fn fetch_pairs(&self, address: &str) -> Result<Vec<TokenPair>, MonitorError> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MonitorError::lookup(
                "dexscreener/tokens",
                format!("status {}", response.status()),
            ));
        }
        let body: TokenPairsResponse = response.json().await?;
        Ok(body.pairs)
    }
}

#[async_trait]
impl FreshnessSource for DexScreenerClient {
    async fn earliest_creation(&self, address: &str) -> Result<Option<i64>, MonitorError> {
        let pairs = self.fetch_pairs(address).await?;
        let earliest = pairs
            .iter()
            .map(|p| normalize_epoch_seconds(p.pair_created_at))
            .filter(|&ts| ts > 0)
            .min();
        Ok(earliest)
    }

    async fn latest_quote(&self, address: &str) -> Result<Option<LatestQuote>, MonitorError> {
        let pairs = self.fetch_pairs(address).await?;
        let Some(pair) = pairs.first() else {
            return Ok(None);
        };
        let txns = pair
            .txns
            .as_ref()
            .and_then(|t| t.h1.as_ref())
            .map(|c| (c.buys, c.sells))
            .unwrap_or((0, 0));
        Ok(Some(LatestQuote {
            price: pair.price_usd.trim().parse().unwrap_or(0.0),
            market_cap: pair.market_cap,
            liquidity: pair.liquidity.as_ref().map(|l| l.usd).unwrap_or(0.0),
            volume_1h: pair.volume.as_ref().map(|v| v.h1).unwrap_or(0.0),
            buys: txns.0,
            sells: txns.1,
            price_change_1h: pair.price_change.as_ref().map(|p| p.h1).unwrap_or(0.0),
        }))
    }
}

// ---------------------------------------------------------------------------
// Honeypot.is-backed safety checker
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HoneypotResponse {
    #[serde(rename = "honeypotResult", default)]
    honeypot_result: Option<HoneypotVerdict>,
    #[serde(rename = "simulationResult", default)]
    simulation_result: Option<SimulationResult>,
}

#[derive(Debug, Deserialize)]
struct HoneypotVerdict {
    #[serde(rename = "isHoneypot", default)]
    is_honeypot: bool,
}

#[derive(Debug, Deserialize, Default)]
struct SimulationResult {
    #[serde(rename = "buyTax", default)]
    buy_tax: Option<f64>,
    #[serde(rename = "sellTax", default)]
    sell_tax: Option<f64>,
}

pub struct HoneypotClient {
    client: reqwest::Client,
    base_url: String,
    chain_id: u64,
}

impl HoneypotClient {
    /// Base mainnet chain id is 8453.
    pub fn new(chain_id: u64) -> Result<Self, MonitorError> {
        Self::with_base_url("https://api.honeypot.is".to_string(), chain_id)
    }

    pub fn with_base_url(base_url: String, chain_id: u64) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url,
            chain_id,
        })
    }
}

#[async_trait]
impl SafetyChecker for HoneypotClient {
    async fn check(&self, address: &str) -> Result<Option<SafetyReport>, MonitorError> {
        let url = format!(
            "{}/v2/IsHoneypot?address={}&chainID={}",
            self.base_url, address, self.chain_id
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MonitorError::lookup(
                "honeypot/IsHoneypot",
                format!("status {}", response.status()),
            ));
        }
        let body: HoneypotResponse = response.json().await?;

        let Some(verdict) = body.honeypot_result else {
            return Ok(None);
        };
        let simulation = body.simulation_result.unwrap_or_default();
        Ok(Some(SafetyReport {
            is_honeypot: if verdict.is_honeypot {
                TriState::Yes
            } else {
                TriState::No
            },
            buy_tax: simulation.buy_tax,
            sell_tax: simulation.sell_tax,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_budget_counts_down() {
        let mut budget = LookupBudget::new(2);
        assert!(budget.try_take());
        assert!(budget.try_take());
        assert!(!budget.try_take());
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_zero_budget_is_exhausted_immediately() {
        let mut budget = LookupBudget::new(0);
        assert!(budget.is_exhausted());
        assert!(!budget.try_take());
    }

    #[test]
    fn test_token_pairs_response_tolerates_sparse_pairs() {
        let body: TokenPairsResponse = serde_json::from_str(
            r#"{"pairs":[{"pairCreatedAt":1700000000000},{"priceUsd":"0.5"}]}"#,
        )
        .unwrap();
        assert_eq!(body.pairs.len(), 2);
        assert_eq!(body.pairs[0].pair_created_at, 1_700_000_000_000);
        assert_eq!(body.pairs[1].pair_created_at, 0);
    }

    #[test]
    fn test_honeypot_response_parsing() {
        let body: HoneypotResponse = serde_json::from_str(
            r#"{"honeypotResult":{"isHoneypot":true},
                "simulationResult":{"buyTax":2.0,"sellTax":55.0}}"#,
        )
        .unwrap();
        assert!(body.honeypot_result.unwrap().is_honeypot);
        assert_eq!(body.simulation_result.unwrap().sell_tax, Some(55.0));
    }
}
