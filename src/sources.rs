//! Provider record sources
//!
//! Each source fetches one provider feed and maps it through the
//! normalizer into `TokenRecord`s. Sources are independent: the
//! orchestrator treats a failed fetch as an empty batch from that
//! provider and carries on with the others.

use crate::error::MonitorError;
use crate::normalizer::{normalize_dexscreener_pair, normalize_pair_entry, normalize_rank_entry};
use crate::record::TokenRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

const GMGN_BASE_URL: &str = "https://gmgn.ai/defi/quotation/v1";
const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";

// GMGN rejects default client user agents.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[async_trait]
pub trait RecordSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, now: i64) -> Result<Vec<TokenRecord>, MonitorError>;
}

fn build_client() -> Result<reqwest::Client, MonitorError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .user_agent(BROWSER_USER_AGENT)
        .build()?)
}

async fn fetch_json(client: &reqwest::Client, url: &str, name: &str) -> Result<Value, MonitorError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(MonitorError::source(
            name,
            format!("status {}", response.status()),
        ));
    }
    Ok(response.json().await?)
}

// ---------------------------------------------------------------------------
// GMGN swap-rank feed
// ---------------------------------------------------------------------------

pub struct GmgnRankSource {
    client: reqwest::Client,
    base_url: String,
    chain: String,
}

impl GmgnRankSource {
    pub fn new(chain: &str) -> Result<Self, MonitorError> {
        Ok(Self {
            client: build_client()?,
            base_url: GMGN_BASE_URL.to_string(),
            chain: chain.to_string(),
        })
    }

    pub fn with_base_url(base_url: String, chain: &str) -> Result<Self, MonitorError> {
        Ok(Self {
            client: build_client()?,
            base_url,
            chain: chain.to_string(),
        })
    }

    /// Graduated tokens only; honeypots come through and are scored
    /// down rather than pre-filtered.
    fn rank_url(&self) -> String {
        format!(
            "{}/rank/{}/swaps/1h?limit=100&orderby=open_timestamp&direction=desc&tag=graduated",
            self.base_url, self.chain
        )
    }
}

/// Entries live under `data.rank`.
pub fn records_from_rank_body(body: &Value, now: i64) -> Vec<TokenRecord> {
    body.get("data")
        .and_then(|d| d.get("rank"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| normalize_rank_entry(e, now))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RecordSource for GmgnRankSource {
    fn name(&self) -> &'static str {
        "gmgn_rank"
    }

    async fn fetch(&self, now: i64) -> Result<Vec<TokenRecord>, MonitorError> {
        let body = fetch_json(&self.client, &self.rank_url(), self.name()).await?;
        Ok(records_from_rank_body(&body, now))
    }
}

// ---------------------------------------------------------------------------
// GMGN new-pairs feed
// ---------------------------------------------------------------------------

pub struct GmgnPairsSource {
    client: reqwest::Client,
    base_url: String,
    chain: String,
}

impl GmgnPairsSource {
    pub fn new(chain: &str) -> Result<Self, MonitorError> {
        Ok(Self {
            client: build_client()?,
            base_url: GMGN_BASE_URL.to_string(),
            chain: chain.to_string(),
        })
    }

    pub fn with_base_url(base_url: String, chain: &str) -> Result<Self, MonitorError> {
        Ok(Self {
            client: build_client()?,
            base_url,
            chain: chain.to_string(),
        })
    }
}

/// Entries live under `data.pairs`.
pub fn records_from_pairs_body(body: &Value, now: i64) -> Vec<TokenRecord> {
    body.get("data")
        .and_then(|d| d.get("pairs"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| normalize_pair_entry(e, now))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RecordSource for GmgnPairsSource {
    fn name(&self) -> &'static str {
        "gmgn_pairs"
    }

    async fn fetch(&self, now: i64) -> Result<Vec<TokenRecord>, MonitorError> {
        let url = format!(
            "{}/pairs/{}/new_pairs?limit=50&orderby=open_timestamp&direction=desc",
            self.base_url, self.chain
        );
        let body = fetch_json(&self.client, &url, self.name()).await?;
        Ok(records_from_pairs_body(&body, now))
    }
}

// ---------------------------------------------------------------------------
// DexScreener keyword search
// ---------------------------------------------------------------------------

pub struct DexScreenerSearchSource {
    client: reqwest::Client,
    base_url: String,
    chain_id: String,
    keywords: Vec<String>,
}

impl DexScreenerSearchSource {
    pub fn new(chain_id: &str, keywords: Vec<String>) -> Result<Self, MonitorError> {
        Ok(Self {
            client: build_client()?,
            base_url: DEXSCREENER_BASE_URL.to_string(),
            chain_id: chain_id.to_string(),
            keywords,
        })
    }

    pub fn with_base_url(
        base_url: String,
        chain_id: &str,
        keywords: Vec<String>,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            client: build_client()?,
            base_url,
            chain_id: chain_id.to_string(),
            keywords,
        })
    }
}

/// Pairs live under `pairs`; only the configured chain is kept.
pub fn records_from_search_body(body: &Value, chain_id: &str, now: i64) -> Vec<TokenRecord> {
    body.get("pairs")
        .and_then(Value::as_array)
        .map(|pairs| {
            pairs
                .iter()
                .filter(|p| {
                    p.get("chainId").and_then(Value::as_str) == Some(chain_id)
                })
                .filter_map(|p| normalize_dexscreener_pair(p, now))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RecordSource for DexScreenerSearchSource {
    fn name(&self) -> &'static str {
        "dexscreener_search"
    }

    async fn fetch(&self, now: i64) -> Result<Vec<TokenRecord>, MonitorError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for (i, keyword) in self.keywords.iter().enumerate() {
            if i > 0 {
                // Unauthenticated search is rate limited.
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            let url = format!("{}/latest/dex/search?q={}", self.base_url, keyword);
            let body = match fetch_json(&self.client, &url, self.name()).await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("🔍 search '{}' failed: {}", keyword, e);
                    continue;
                }
            };
            for record in records_from_search_body(&body, &self.chain_id, now) {
                if seen.insert(record.address.clone()) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}
