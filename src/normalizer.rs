//! Record normalization from raw provider payloads to `TokenRecord`
//!
//! Each provider ships its own response shape; one function per shape maps
//! a single raw entry to zero or one canonical record. A payload without an
//! address yields `None` (the batch continues). Numeric fields are coerced
//! defensively: missing, null, or non-numeric values become the field's
//! documented default, never an error.

use crate::record::{Source, TokenRecord, TriState, MIN_VALID_TIMESTAMP};
use serde_json::Value;

/// GMGN rank API entry (graduated tokens, flat shape).
pub fn normalize_rank_entry(raw: &Value, now: i64) -> Option<TokenRecord> {
    let address = lower_str(raw.get("address"));
    if address.is_empty() {
        return None;
    }

    let open_timestamp = coerce_i64(raw.get("open_timestamp"));
    let mut record = TokenRecord {
        address,
        symbol: coerce_str(raw.get("symbol")),
        price: coerce_f64(raw.get("price")),
        market_cap: coerce_f64(raw.get("market_cap")),
        liquidity: coerce_f64(raw.get("liquidity")),
        volume_1h: coerce_f64(raw.get("volume")),
        swaps: coerce_i64(raw.get("swaps")),
        buys: coerce_i64(raw.get("buys")),
        sells: coerce_i64(raw.get("sells")),
        holders: coerce_i64(raw.get("holder_count")),
        price_change_1h: coerce_f64(raw.get("price_change_percent1h")),
        open_timestamp,
        website: coerce_str(raw.get("website")),
        twitter: coerce_str(raw.get("twitter_username")),
        telegram: coerce_str(raw.get("telegram")),
        is_honeypot: coerce_tri(raw.get("is_honeypot")),
        buy_tax: coerce_opt_f64(raw.get("buy_tax")),
        sell_tax: coerce_opt_f64(raw.get("sell_tax")),
        renounced: coerce_tri(raw.get("renounced")),
        smart_buy_24h: coerce_i64(raw.get("smart_buy_24h")),
        smart_sell_24h: coerce_i64(raw.get("smart_sell_24h")),
        source: Source::GmgnRank,
        ..Default::default()
    };
    record.refresh_age(now);
    Some(record)
}

/// GMGN new-pairs API entry (token info nested under `base_token_info`).
pub fn normalize_pair_entry(raw: &Value, now: i64) -> Option<TokenRecord> {
    let info = raw.get("base_token_info")?;
    let address = lower_str(info.get("address"));
    if address.is_empty() {
        return None;
    }

    let social = info.get("social_links").cloned().unwrap_or(Value::Null);
    let mut record = TokenRecord {
        address,
        symbol: coerce_str(info.get("symbol")),
        price: coerce_f64(info.get("price")),
        market_cap: coerce_f64(info.get("market_cap")),
        liquidity: coerce_f64(info.get("liquidity")),
        volume_1h: coerce_f64(info.get("volume")),
        swaps: coerce_i64(info.get("swaps")),
        buys: coerce_i64(info.get("buys")),
        sells: coerce_i64(info.get("sells")),
        holders: coerce_i64(info.get("holder_count")),
        price_change_1h: coerce_f64(info.get("price_change_percent1h")),
        open_timestamp: coerce_i64(raw.get("open_timestamp")),
        website: coerce_str(social.get("website")),
        twitter: coerce_str(social.get("twitter_username")),
        telegram: coerce_str(social.get("telegram")),
        is_honeypot: coerce_tri(info.get("is_honeypot")),
        buy_tax: coerce_opt_f64(info.get("buy_tax")),
        sell_tax: coerce_opt_f64(info.get("sell_tax")),
        renounced: coerce_tri(info.get("renounced")),
        source: Source::GmgnPairs,
        ..Default::default()
    };
    record.refresh_age(now);
    Some(record)
}

/// DexScreener search pair. Holder counts and safety data are not
/// reported by this provider and stay at their unknown defaults.
pub fn normalize_dexscreener_pair(raw: &Value, now: i64) -> Option<TokenRecord> {
    let base = raw.get("baseToken")?;
    let address = lower_str(base.get("address"));
    if address.is_empty() {
        return None;
    }

    // pairCreatedAt is reported in milliseconds.
    let created_ms = coerce_i64(raw.get("pairCreatedAt"));
    let open_timestamp = normalize_epoch_seconds(created_ms);

    let txns_1h = raw
        .get("txns")
        .and_then(|t| t.get("h1"))
        .cloned()
        .unwrap_or(Value::Null);
    let buys = coerce_i64(txns_1h.get("buys"));
    let sells = coerce_i64(txns_1h.get("sells"));

    let (website, twitter, telegram) = extract_dexscreener_links(raw.get("info"));

    let mut record = TokenRecord {
        address,
        symbol: coerce_str(base.get("symbol")),
        price: coerce_f64(raw.get("priceUsd")),
        market_cap: coerce_f64(raw.get("marketCap")),
        liquidity: coerce_f64(raw.get("liquidity").and_then(|l| l.get("usd"))),
        volume_1h: coerce_f64(raw.get("volume").and_then(|v| v.get("h1"))),
        swaps: buys + sells,
        buys,
        sells,
        price_change_1h: coerce_f64(raw.get("priceChange").and_then(|p| p.get("h1"))),
        open_timestamp,
        website,
        twitter,
        telegram,
        source: Source::DexScreener,
        ..Default::default()
    };
    record.refresh_age(now);
    Some(record)
}

/// Normalize a provider timestamp to epoch seconds, detecting millisecond
/// values. Returns 0 for anything implausibly small.
pub fn normalize_epoch_seconds(ts: i64) -> i64 {
    if ts > 1_000_000_000_000 {
        ts / 1000
    } else if ts >= MIN_VALID_TIMESTAMP {
        ts
    } else {
        0
    }
}

fn extract_dexscreener_links(info: Option<&Value>) -> (String, String, String) {
    let mut website = String::new();
    let mut twitter = String::new();
    let mut telegram = String::new();

    let Some(info) = info else {
        return (website, twitter, telegram);
    };

    if let Some(sites) = info.get("websites").and_then(Value::as_array) {
        if let Some(first) = sites.first() {
            website = coerce_str(first.get("url"));
        }
    }

    if let Some(socials) = info.get("socials").and_then(Value::as_array) {
        for social in socials {
            let url = coerce_str(social.get("url"));
            match social.get("type").and_then(Value::as_str) {
                // Keep just the handle from a profile URL.
                Some("twitter") => {
                    twitter = url.rsplit('/').next().unwrap_or(&url).to_string();
                }
                Some("telegram") => telegram = url,
                _ => {}
            }
        }
    }

    (website, twitter, telegram)
}

fn coerce_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn coerce_opt_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_tri(value: Option<&Value>) -> TriState {
    match value {
        Some(Value::Number(n)) => TriState::from_flag(n.as_i64()),
        Some(Value::Bool(b)) => {
            if *b {
                TriState::Yes
            } else {
                TriState::No
            }
        }
        Some(Value::String(s)) => TriState::from_flag(s.trim().parse().ok()),
        _ => TriState::Unknown,
    }
}

fn coerce_str(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn lower_str(value: Option<&Value>) -> String {
    coerce_str(value).to_lowercase()
}
