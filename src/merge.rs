//! Merge/dedup engine: one canonical record per address
//!
//! Records for the same address from multiple sources are collapsed into a
//! single record. The highest-priority source wins outright (first-seen
//! order breaks ties); lower-priority records only backfill fields the
//! primary left empty. Conflicting non-empty values are never averaged or
//! reconciled.

use crate::record::{TokenRecord, TriState};
use std::collections::HashMap;

/// Merge a batch of normalized records into one record per address.
///
/// Idempotent: merging an already-merged batch returns it unchanged.
/// Output preserves the first-seen order of addresses.
pub fn merge_records(records: Vec<TokenRecord>) -> Vec<TokenRecord> {
    let mut groups: Vec<Vec<TokenRecord>> = Vec::new();
    let mut index_by_address: HashMap<String, usize> = HashMap::new();

    for record in records {
        if record.address.is_empty() {
            continue;
        }
        match index_by_address.get(&record.address) {
            Some(&idx) => groups[idx].push(record),
            None => {
                index_by_address.insert(record.address.clone(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    groups.into_iter().map(merge_group).collect()
}

/// Collapse one address group: pick the primary by source priority
/// (first-seen wins ties), then backfill its empty fields from the rest
/// in priority order.
fn merge_group(mut group: Vec<TokenRecord>) -> TokenRecord {
    if group.len() == 1 {
        return group.pop().expect("group is non-empty");
    }

    // Stable sort keeps first-seen order within equal priorities.
    group.sort_by_key(|r| std::cmp::Reverse(r.source.priority()));

    let mut iter = group.into_iter();
    let mut primary = iter.next().expect("group is non-empty");
    for donor in iter {
        backfill(&mut primary, &donor);
    }
    primary
}

/// Copy non-empty donor values into empty primary fields. `address`,
/// `symbol`, and `source` always stay with the primary.
fn backfill(primary: &mut TokenRecord, donor: &TokenRecord) {
    fill_f64(&mut primary.price, donor.price);
    fill_f64(&mut primary.market_cap, donor.market_cap);
    fill_f64(&mut primary.liquidity, donor.liquidity);
    fill_f64(&mut primary.volume_1h, donor.volume_1h);
    fill_f64(&mut primary.price_change_1h, donor.price_change_1h);
    fill_i64(&mut primary.swaps, donor.swaps);
    fill_i64(&mut primary.buys, donor.buys);
    fill_i64(&mut primary.sells, donor.sells);
    fill_i64(&mut primary.holders, donor.holders);
    fill_i64(&mut primary.open_timestamp, donor.open_timestamp);
    fill_i64(&mut primary.smart_buy_24h, donor.smart_buy_24h);
    fill_i64(&mut primary.smart_sell_24h, donor.smart_sell_24h);
    fill_str(&mut primary.website, &donor.website);
    fill_str(&mut primary.twitter, &donor.twitter);
    fill_str(&mut primary.telegram, &donor.telegram);
    fill_tri(&mut primary.is_honeypot, donor.is_honeypot);
    fill_tri(&mut primary.renounced, donor.renounced);
    fill_opt(&mut primary.buy_tax, donor.buy_tax);
    fill_opt(&mut primary.sell_tax, donor.sell_tax);
}

fn fill_f64(dst: &mut f64, src: f64) {
    if *dst == 0.0 && src != 0.0 {
        *dst = src;
    }
}

fn fill_i64(dst: &mut i64, src: i64) {
    if *dst == 0 && src != 0 {
        *dst = src;
    }
}

fn fill_str(dst: &mut String, src: &str) {
    if dst.is_empty() && !src.is_empty() {
        *dst = src.to_string();
    }
}

fn fill_tri(dst: &mut TriState, src: TriState) {
    if !dst.is_known() && src.is_known() {
        *dst = src;
    }
}

fn fill_opt(dst: &mut Option<f64>, src: Option<f64>) {
    if dst.is_none() {
        *dst = src;
    }
}
