//! Cycle orchestrator
//!
//! One polling tick: fetch every source, normalize and merge, decide what
//! is new against the durable store, score duplicate-symbol clusters,
//! notify, refresh tracked entries, run periodic safety re-checks, then
//! expire/archive/clean and persist. Provider failures degrade to empty
//! batches; only persistence failures abort a cycle.

use crate::config::MonitorConfig;
use crate::enrich::{FreshnessSource, LookupBudget, SafetyChecker};
use crate::error::MonitorError;
use crate::featured::FeaturedTagger;
use crate::filter::QualityFilter;
use crate::lifecycle::{run_lifecycle, Archive, LifecycleReport};
use crate::merge::merge_records;
use crate::notify::{NotificationBatch, Notifier};
use crate::record::{TokenRecord, TriState, TrustRank};
use crate::scoring::{score_cluster, score_single};
use crate::sources::RecordSource;
use crate::store::StateStore;
use std::collections::{HashMap, HashSet};

/// Cooldown before re-checking an address whose last check was clean.
const SAFETY_RECHECK_SAFE_SECS: i64 = 6 * 3600;
/// Cooldown when the last check was inconclusive.
const SAFETY_RECHECK_UNKNOWN_SECS: i64 = 3600;

#[derive(Debug, Default)]
pub struct CycleReport {
    pub fetched: usize,
    pub merged: usize,
    pub new_candidates: usize,
    pub notified: usize,
    pub featured: usize,
    pub refreshed: usize,
    pub safety_checked: usize,
    pub lookups_spent: u32,
    pub lifecycle: LifecycleReport,
}

pub struct Monitor {
    config: MonitorConfig,
    sources: Vec<Box<dyn RecordSource>>,
    freshness: Box<dyn FreshnessSource>,
    safety: Box<dyn SafetyChecker>,
    notifier: Box<dyn Notifier>,
    filter: QualityFilter,
    tagger: FeaturedTagger,
    store: StateStore,
    archive: Archive,
    cycle_index: u64,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        sources: Vec<Box<dyn RecordSource>>,
        freshness: Box<dyn FreshnessSource>,
        safety: Box<dyn SafetyChecker>,
        notifier: Box<dyn Notifier>,
        store: StateStore,
        archive: Archive,
    ) -> Self {
        let filter = QualityFilter::from_config(&config);
        let tagger = FeaturedTagger::new(&config.featured_keywords);
        Self {
            config,
            sources,
            freshness,
            safety,
            notifier,
            filter,
            tagger,
            store,
            archive,
            cycle_index: 0,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn run_cycle(&mut self, now: i64) -> Result<CycleReport, MonitorError> {
        self.cycle_index += 1;
        let mut report = CycleReport::default();
        let mut budget = LookupBudget::new(self.config.lookup_budget_per_cycle);

        // 1. Fetch. A dead provider is an empty batch, not a dead cycle.
        let mut raw: Vec<TokenRecord> = Vec::new();
        for source in &self.sources {
            match source.fetch(now).await {
                Ok(records) => {
                    log::debug!("📡 {}: {} record(s)", source.name(), records.len());
                    raw.extend(records);
                }
                Err(e) => log::warn!("📡 {} failed: {}", source.name(), e),
            }
        }
        report.fetched = raw.len();

        // 2. Merge to one record per address.
        let mut merged = merge_records(raw);
        for record in &mut merged {
            record.refresh_age(now);
        }
        report.merged = merged.len();

        // 3. Tracked entries can learn a listing time the feed resolved
        //    later than first sighting.
        self.backfill_known_timestamps(&merged, now);

        // 4. Split new vs already tracked.
        let (known, mut fresh): (Vec<TokenRecord>, Vec<TokenRecord>) = merged
            .into_iter()
            .partition(|r| self.store.contains(&r.address));

        // 5. Validate listing times for the new arrivals while the budget
        //    lasts; feeds sometimes report a later time than the actual
        //    pool creation, and the age filter and earliest-listing
        //    comparison both need the true one.
        self.resolve_timestamps(&mut fresh, &mut budget, now).await;

        // 6. Quality gate and featured tagging.
        let mut candidates = self.filter.apply(fresh, now);
        self.tagger.tag_all(&mut candidates);
        report.new_candidates = candidates.len();
        report.featured = candidates.iter().filter(|r| r.featured).count();

        // 7. Score duplicate-symbol clusters against tracked history.
        self.score_candidates(&mut candidates, &mut budget, now).await;

        // 8. Track and notify.
        if !candidates.is_empty() {
            for record in &candidates {
                self.store.upsert(record.clone(), now);
            }
            let batch = NotificationBatch::new(candidates, now);
            report.notified = batch.count;
            self.notifier.publish(&batch).await?;
        }

        // 9. Refresh tracked entries from this cycle's feed data.
        report.refreshed = self.refresh_tracked(&known, &mut budget, now).await;

        // 10. Periodic honeypot/tax re-checks.
        if self.cycle_index % self.config.safety_check_interval_cycles == 0 {
            report.safety_checked = self.run_safety_rechecks(now).await;
        }

        // 11. Expire, archive, clean, persist.
        report.lifecycle = run_lifecycle(
            &mut self.store,
            &mut self.archive,
            self.config.observation_window_secs(),
            now,
        )?;
        self.store.save()?;

        report.lookups_spent = self.config.lookup_budget_per_cycle - budget.remaining();
        Ok(report)
    }

    fn backfill_known_timestamps(&mut self, merged: &[TokenRecord], now: i64) {
        for record in merged {
            if !record.has_valid_open_timestamp() {
                continue;
            }
            if let Some(entry) = self.store.get_mut(&record.address) {
                if !entry.record.has_valid_open_timestamp() {
                    entry.record.open_timestamp = record.open_timestamp;
                    entry.record.refresh_age(now);
                }
            }
        }
    }

    /// Check every new record against the earliest known pool-creation
    /// time: fill in unknowns, and lower timestamps the feed inflated.
    async fn resolve_timestamps(
        &self,
        records: &mut [TokenRecord],
        budget: &mut LookupBudget,
        now: i64,
    ) {
        for record in records.iter_mut() {
            if !budget.try_take() {
                log::debug!("⏱️ lookup budget exhausted, leaving {} unvalidated", record.address);
                break;
            }
            match self.freshness.earliest_creation(&record.address).await {
                Ok(Some(ts)) => {
                    if !record.has_valid_open_timestamp() || ts < record.open_timestamp {
                        record.open_timestamp = ts;
                        record.refresh_age(now);
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("⏱️ listing-time lookup for {} failed: {}", record.address, e),
            }
        }
    }

    /// Cluster new candidates with tracked records sharing their symbol,
    /// score, and write results back to both sides.
    async fn score_candidates(
        &mut self,
        candidates: &mut [TokenRecord],
        budget: &mut LookupBudget,
        now: i64,
    ) {
        let candidate_addresses: HashSet<String> =
            candidates.iter().map(|r| r.address.clone()).collect();

        let mut clusters: HashMap<String, Vec<TokenRecord>> = HashMap::new();
        for record in candidates.iter() {
            clusters
                .entry(record.symbol.to_uppercase())
                .or_default()
                .push(record.clone());
        }
        for record in self.store.records() {
            if record.symbol.is_empty() {
                continue;
            }
            if let Some(cluster) = clusters.get_mut(&record.symbol.to_uppercase()) {
                if !candidate_addresses.contains(&record.address) {
                    cluster.push(record.clone());
                }
            }
        }

        let mut by_address: HashMap<String, &mut TokenRecord> = candidates
            .iter_mut()
            .map(|r| (r.address.clone(), r))
            .collect();

        for (symbol, mut cluster) in clusters {
            if cluster.len() < 2 {
                if let Some(record) = cluster
                    .first()
                    .and_then(|r| by_address.get_mut(&r.address))
                {
                    score_single(record, now);
                }
                continue;
            }

            // Cluster members with unresolved listing times would forfeit
            // the earliest-listing comparison; spend bounded lookups on
            // them first.
            let mut cluster_budget = self.config.lookup_budget_per_cluster;
            for member in cluster.iter_mut() {
                if member.has_valid_open_timestamp() || cluster_budget == 0 {
                    continue;
                }
                if !budget.try_take() {
                    break;
                }
                cluster_budget -= 1;
                match self.freshness.earliest_creation(&member.address).await {
                    Ok(Some(ts)) => {
                        member.open_timestamp = ts;
                        member.refresh_age(now);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("⏱️ listing-time lookup for {} failed: {}", member.address, e)
                    }
                }
            }

            score_cluster(&mut cluster, now);
            let summary: Vec<String> = cluster
                .iter()
                .map(|r| {
                    format!(
                        "{}={}({})",
                        short_address(&r.address),
                        r.trust_score,
                        r.trust_rank.map(|t| t.label()).unwrap_or("-")
                    )
                })
                .collect();
            log::info!("⚖️ {}: {}", symbol, summary.join(", "));

            for member in cluster {
                if let Some(candidate) = by_address.get_mut(&member.address) {
                    candidate.trust_score = member.trust_score;
                    candidate.trust_rank = member.trust_rank;
                    candidate.suspect_honeypot = member.suspect_honeypot;
                    candidate.open_timestamp = member.open_timestamp;
                    candidate.refresh_age(now);
                } else if let Some(entry) = self.store.get_mut(&member.address) {
                    entry.record.trust_score = member.trust_score;
                    entry.record.trust_rank = member.trust_rank;
                    entry.record.suspect_honeypot = member.suspect_honeypot;
                }
            }
        }
    }

    /// Update tracked entries from the records seen this cycle, and pull
    /// quotes for key projects the feeds went quiet on.
    async fn refresh_tracked(
        &mut self,
        seen: &[TokenRecord],
        budget: &mut LookupBudget,
        now: i64,
    ) -> usize {
        let mut refreshed = 0;
        let seen_addresses: HashSet<&str> = seen.iter().map(|r| r.address.as_str()).collect();

        for record in seen {
            if let Some(entry) = self.store.get_mut(&record.address) {
                apply_feed_refresh(&mut entry.record, record, now);
                refreshed += 1;
            }
        }

        // Key projects: tracked entries worth keeping current even when
        // no feed mentions them this cycle.
        let quiet_keys: Vec<String> = self
            .store
            .iter()
            .filter(|(addr, entry)| {
                !seen_addresses.contains(addr.as_str())
                    && (entry.record.has_social()
                        || entry.record.trust_rank == Some(TrustRank::Verified))
            })
            .map(|(addr, _)| addr.clone())
            .collect();

        for address in quiet_keys {
            if !budget.try_take() {
                break;
            }
            match self.freshness.latest_quote(&address).await {
                Ok(Some(quote)) => {
                    if let Some(entry) = self.store.get_mut(&address) {
                        let r = &mut entry.record;
                        if quote.price > 0.0 {
                            r.price = quote.price;
                        }
                        if quote.market_cap > 0.0 {
                            r.market_cap = quote.market_cap;
                        }
                        if quote.liquidity > 0.0 {
                            r.liquidity = quote.liquidity;
                        }
                        if quote.volume_1h > 0.0 {
                            r.volume_1h = quote.volume_1h;
                        }
                        r.price_change_1h = quote.price_change_1h;
                        r.buys = r.buys.max(quote.buys);
                        r.sells = r.sells.max(quote.sells);
                        r.refresh_age(now);
                        refreshed += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("💹 quote refresh for {} failed: {}", address, e),
            }
        }
        refreshed
    }

    /// Re-check honeypot/tax status for tracked entries whose cooldown
    /// has elapsed. Confirmed honeypots are never re-checked.
    async fn run_safety_rechecks(&mut self, now: i64) -> usize {
        let mut due: Vec<String> = self
            .store
            .iter()
            .filter(|(_, entry)| safety_recheck_due(entry.record.is_honeypot, entry.last_safety_check_at, now))
            .map(|(addr, _)| addr.clone())
            .collect();
        due.sort();
        due.truncate(self.config.safety_checks_per_cycle as usize);

        let mut checked = 0;
        for address in due {
            match self.safety.check(&address).await {
                Ok(Some(result)) => {
                    if let Some(entry) = self.store.get_mut(&address) {
                        if result.is_honeypot.is_yes()
                            && !entry.record.is_honeypot.is_yes()
                        {
                            log::warn!("🍯 {} now flags as a honeypot", address);
                        }
                        entry.record.is_honeypot = result.is_honeypot;
                        if result.buy_tax.is_some() {
                            entry.record.buy_tax = result.buy_tax;
                        }
                        if result.sell_tax.is_some() {
                            entry.record.sell_tax = result.sell_tax;
                        }
                        entry.last_safety_check_at = now;
                        checked += 1;
                    }
                }
                Ok(None) => {
                    if let Some(entry) = self.store.get_mut(&address) {
                        entry.last_safety_check_at = now;
                    }
                }
                Err(e) => log::warn!("🍯 safety check for {} failed: {}", address, e),
            }
        }
        checked
    }
}

/// Overwrite dynamic market fields from a fresh feed record. Identity and
/// scoring fields stay; trade counters only ratchet upward.
fn apply_feed_refresh(tracked: &mut TokenRecord, fresh: &TokenRecord, now: i64) {
    if fresh.price > 0.0 {
        tracked.price = fresh.price;
    }
    if fresh.market_cap > 0.0 {
        tracked.market_cap = fresh.market_cap;
    }
    if fresh.liquidity > 0.0 {
        tracked.liquidity = fresh.liquidity;
    }
    if fresh.volume_1h > 0.0 {
        tracked.volume_1h = fresh.volume_1h;
    }
    if fresh.holders > 0 {
        tracked.holders = fresh.holders;
    }
    tracked.price_change_1h = fresh.price_change_1h;
    tracked.buys = tracked.buys.max(fresh.buys);
    tracked.sells = tracked.sells.max(fresh.sells);
    if fresh.smart_buy_24h > 0 {
        tracked.smart_buy_24h = fresh.smart_buy_24h;
    }
    if fresh.smart_sell_24h > 0 {
        tracked.smart_sell_24h = fresh.smart_sell_24h;
    }
    if !tracked.has_valid_open_timestamp() && fresh.has_valid_open_timestamp() {
        tracked.open_timestamp = fresh.open_timestamp;
    }
    if tracked.website.is_empty() {
        tracked.website = fresh.website.clone();
    }
    if tracked.twitter.is_empty() {
        tracked.twitter = fresh.twitter.clone();
    }
    if tracked.telegram.is_empty() {
        tracked.telegram = fresh.telegram.clone();
    }
    tracked.refresh_age(now);
}

/// Leading characters of an address for log lines. Char-based so an
/// unexpected non-ASCII address cannot split a byte boundary.
fn short_address(address: &str) -> String {
    address.chars().take(8).collect()
}

fn safety_recheck_due(is_honeypot: TriState, last_check: i64, now: i64) -> bool {
    match is_honeypot {
        TriState::Yes => false,
        TriState::No => now - last_check >= SAFETY_RECHECK_SAFE_SECS,
        TriState::Unknown => now - last_check >= SAFETY_RECHECK_UNKNOWN_SECS,
    }
}
