//! Trust scoring for same-symbol clusters
//!
//! When several records share a display symbol, at most one of them is the
//! genuine asset and the rest are likely impersonators. Each record gets an
//! additive score; comparative criteria (earliest listing, deepest
//! liquidity, most holders, most smart-money buys) are awarded against the
//! cluster maxima, intrinsic criteria (social presence, renounced
//! ownership) and penalties (thin liquidity for the asset's age, suspicious
//! trade imbalance, honeypot/tax findings) apply to every record.
//!
//! Rank labels are relative: only the strict top scorer can be verified,
//! everything strictly below it is treated as a likely counterfeit. A
//! cluster of one keeps its raw score but gets no label, since there is
//! nothing to compare against.

use crate::record::{TokenRecord, TrustRank};

/// Minimum score for the top of a cluster to be labeled verified.
pub const VERIFIED_MIN_SCORE: i32 = 7;

/// Cluster-wide maxima the comparative criteria are scored against.
#[derive(Debug, Clone, Default)]
pub struct ClusterStats {
    pub earliest_open: i64,
    pub max_liquidity: f64,
    pub max_holders: i64,
    pub max_smart_buys: i64,
}

impl ClusterStats {
    /// Stats that award no comparative bonus to anyone. Used for
    /// singleton scoring.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cluster(cluster: &[TokenRecord]) -> Self {
        Self {
            // Invalid timestamps are unknown, not "earliest".
            earliest_open: cluster
                .iter()
                .filter(|r| r.has_valid_open_timestamp())
                .map(|r| r.open_timestamp)
                .min()
                .unwrap_or(0),
            max_liquidity: cluster.iter().map(|r| r.liquidity).fold(0.0, f64::max),
            max_holders: cluster.iter().map(|r| r.holders).max().unwrap_or(0),
            max_smart_buys: cluster.iter().map(|r| r.smart_buy_24h).max().unwrap_or(0),
        }
    }
}

/// Score one record against its cluster stats. Writes `trust_score` and
/// `suspect_honeypot`; does not touch `trust_rank`.
pub fn score_record(record: &mut TokenRecord, stats: &ClusterStats, now: i64) {
    let mut score = 0;

    // Comparative criteria: bonus goes to the record(s) matching the
    // cluster maximum, nothing for everyone else.
    if stats.earliest_open > 0
        && record.has_valid_open_timestamp()
        && record.open_timestamp == stats.earliest_open
    {
        score += 3;
    }
    if stats.max_liquidity > 0.0 && record.liquidity == stats.max_liquidity {
        score += 2;
    }
    if stats.max_holders > 0 && record.holders == stats.max_holders {
        score += 2;
    }
    if stats.max_smart_buys > 0 && record.smart_buy_24h == stats.max_smart_buys {
        score += 3;
    }

    // Intrinsic criteria.
    if record.has_social() {
        score += 3;
    }
    if record.renounced.is_yes() {
        score += 2;
    }

    score += liquidity_age_penalty(record.liquidity, record.age_hours_at(now));

    // Heavy one-sided buying with no exit is the classic honeypot shape.
    let imbalanced =
        record.buys > 50 && (record.sells == 0 || record.buys >= record.sells * 3);
    if imbalanced {
        score -= 3;
    }
    record.suspect_honeypot = imbalanced;

    if record.is_honeypot.is_yes() {
        score -= 5;
    } else if let Some(sell_tax) = record.sell_tax {
        if sell_tax >= 50.0 {
            score -= 4;
        } else if sell_tax >= 20.0 {
            score -= 2;
        }
    }

    record.trust_score = score;
}

/// Liquidity should grow or at least persist as an asset matures; thin
/// pools on older assets are penalized progressively harder.
fn liquidity_age_penalty(liquidity: f64, age_hours: f64) -> i32 {
    if age_hours < 1.0 {
        if liquidity < 10_000.0 {
            -1
        } else {
            0
        }
    } else if age_hours < 24.0 {
        if liquidity < 10_000.0 {
            -2
        } else if liquidity < 20_000.0 {
            -1
        } else {
            0
        }
    } else if age_hours < 48.0 {
        if liquidity < 10_000.0 {
            -4
        } else if liquidity < 20_000.0 {
            -2
        } else {
            0
        }
    } else if liquidity < 10_000.0 {
        -6
    } else if liquidity < 20_000.0 {
        -3
    } else {
        0
    }
}

/// Score a same-symbol cluster of two or more records, sort it descending
/// by score, and assign rank labels.
pub fn score_cluster(cluster: &mut Vec<TokenRecord>, now: i64) {
    if cluster.len() < 2 {
        if let Some(record) = cluster.first_mut() {
            score_single(record, now);
        }
        return;
    }

    let stats = ClusterStats::from_cluster(cluster);
    for record in cluster.iter_mut() {
        score_record(record, &stats, now);
    }

    cluster.sort_by(|a, b| b.trust_score.cmp(&a.trust_score));
    assign_ranks(cluster);
}

/// Score a standalone record: comparative criteria contribute nothing,
/// and no rank label is assigned.
pub fn score_single(record: &mut TokenRecord, now: i64) {
    score_record(record, &ClusterStats::empty(), now);
    record.trust_rank = None;
}

/// `cluster` must already be sorted descending by `trust_score`.
fn assign_ranks(cluster: &mut [TokenRecord]) {
    let top_score = cluster[0].trust_score;
    let lowest_score = cluster[cluster.len() - 1].trust_score;

    for (i, record) in cluster.iter_mut().enumerate() {
        record.trust_rank = Some(if i == 0 && record.trust_score > lowest_score {
            if record.trust_score >= VERIFIED_MIN_SCORE {
                TrustRank::Verified
            } else {
                TrustRank::NeedsReview
            }
        } else if record.trust_score == top_score {
            // Tied with the top: nobody can be called genuine.
            TrustRank::NeedsReview
        } else {
            TrustRank::LikelyCounterfeit
        });
    }
}
