//! End-to-end cycle tests
//!
//! Drive the full orchestrator with mock sources and sinks: discovery and
//! notification on the first sighting, suppression on the second,
//! duplicate-symbol scoring, persistence across restarts, and expiry into
//! the archive.

#[cfg(test)]
mod cycle_integration_tests {
    use async_trait::async_trait;
    use basewatch::cycle::Monitor;
    use basewatch::enrich::{FreshnessSource, LatestQuote, SafetyChecker, SafetyReport};
    use basewatch::lifecycle::Archive;
    use basewatch::notify::{NotificationBatch, Notifier};
    use basewatch::record::{Source, TokenRecord, TrustRank, TriState};
    use basewatch::sources::RecordSource;
    use basewatch::store::StateStore;
    use basewatch::{MonitorConfig, MonitorError};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    const NOW: i64 = 1_700_000_000;

    struct StaticSource {
        records: Vec<TokenRecord>,
    }

    #[async_trait]
    impl RecordSource for StaticSource {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _now: i64) -> Result<Vec<TokenRecord>, MonitorError> {
            Ok(self.records.clone())
        }
    }

    struct NullFreshness;

    #[async_trait]
    impl FreshnessSource for NullFreshness {
        async fn earliest_creation(&self, _address: &str) -> Result<Option<i64>, MonitorError> {
            Ok(None)
        }

        async fn latest_quote(&self, _address: &str) -> Result<Option<LatestQuote>, MonitorError> {
            Ok(None)
        }
    }

    struct MapFreshness {
        creations: std::collections::HashMap<String, i64>,
    }

    #[async_trait]
    impl FreshnessSource for MapFreshness {
        async fn earliest_creation(&self, address: &str) -> Result<Option<i64>, MonitorError> {
            Ok(self.creations.get(address).copied())
        }

        async fn latest_quote(&self, _address: &str) -> Result<Option<LatestQuote>, MonitorError> {
            Ok(None)
        }
    }

    struct NullSafety;

    #[async_trait]
    impl SafetyChecker for NullSafety {
        async fn check(&self, _address: &str) -> Result<Option<SafetyReport>, MonitorError> {
            Ok(None)
        }
    }

    #[derive(Clone, Default)]
    struct CollectingNotifier {
        batches: Arc<Mutex<Vec<(usize, Vec<(String, i32, Option<TrustRank>)>)>>>,
    }

    #[async_trait]
    impl Notifier for CollectingNotifier {
        async fn publish(&self, batch: &NotificationBatch) -> Result<(), MonitorError> {
            let projects = batch
                .projects
                .iter()
                .map(|p| (p.address.clone(), p.trust_score, p.trust_rank))
                .collect();
            self.batches.lock().unwrap().push((batch.count, projects));
            Ok(())
        }
    }

    fn make_record(address: &str, symbol: &str, liquidity: f64, age_hours: f64) -> TokenRecord {
        TokenRecord {
            address: address.to_string(),
            symbol: symbol.to_string(),
            liquidity,
            holders: 100,
            open_timestamp: NOW - (age_hours * 3600.0) as i64,
            source: Source::GmgnRank,
            ..Default::default()
        }
    }

    fn make_monitor(
        dir: &Path,
        records: Vec<TokenRecord>,
        notifier: CollectingNotifier,
    ) -> Monitor {
        make_monitor_with_freshness(dir, records, notifier, Box::new(NullFreshness))
    }

    fn make_monitor_with_freshness(
        dir: &Path,
        records: Vec<TokenRecord>,
        notifier: CollectingNotifier,
        freshness: Box<dyn FreshnessSource>,
    ) -> Monitor {
        let config = MonitorConfig {
            state_path: dir.join("state.json"),
            archive_path: dir.join("archive.json"),
            archive_index_path: dir.join("index.json"),
            notify_path: dir.join("notify.json"),
            ..Default::default()
        };
        let store = StateStore::load(&config.state_path).unwrap();
        let archive = Archive::load(&config.archive_path, &config.archive_index_path).unwrap();
        Monitor::new(
            config,
            vec![Box::new(StaticSource { records })],
            freshness,
            Box::new(NullSafety),
            Box::new(notifier),
            store,
            archive,
        )
    }

    #[tokio::test]
    async fn test_second_sighting_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = CollectingNotifier::default();
        let records = vec![
            make_record("0xaa", "FOO", 20_000.0, 2.0),
            make_record("0xbb", "BAR", 30_000.0, 5.0),
        ];
        let mut monitor = make_monitor(dir.path(), records, notifier.clone());

        // 1. First cycle discovers and notifies both.
        let report = monitor.run_cycle(NOW).await.unwrap();
        assert_eq!(report.new_candidates, 2);
        assert_eq!(report.notified, 2);

        // 2. Second cycle sees the same feed: nothing new, no batch.
        let report = monitor.run_cycle(NOW + 600).await.unwrap();
        assert_eq!(report.new_candidates, 0);
        assert_eq!(report.notified, 0);
        assert_eq!(report.refreshed, 2);

        assert_eq!(notifier.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_symbols_are_scored_and_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = CollectingNotifier::default();

        let mut genuine = make_record("0xaa", "FOO", 50_000.0, 12.0);
        genuine.holders = 500;
        genuine.twitter = "foo".to_string();
        genuine.renounced = TriState::Yes;
        let copy = make_record("0xbb", "FOO", 10_000.0, 10.0);

        let mut monitor = make_monitor(dir.path(), vec![genuine, copy], notifier.clone());
        monitor.run_cycle(NOW).await.unwrap();

        let batches = notifier.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let projects = &batches[0].1;
        let find = |addr: &str| projects.iter().find(|(a, _, _)| a == addr).unwrap();

        let (_, score, rank) = find("0xaa");
        assert_eq!(*score, 12);
        assert_eq!(*rank, Some(TrustRank::Verified));

        let (_, score, rank) = find("0xbb");
        assert!(*score < 0);
        assert_eq!(*rank, Some(TrustRank::LikelyCounterfeit));
    }

    #[tokio::test]
    async fn test_inflated_feed_timestamp_is_lowered_before_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = CollectingNotifier::default();

        // The feed reports the genuine token as listed at 10h but the pool
        // actually opened at 20h; the copy's feed timestamp (12h) would
        // otherwise steal the earliest-listing bonus.
        let mut genuine = make_record("0xaa", "FOO", 50_000.0, 10.0);
        genuine.holders = 500;
        genuine.twitter = "foo".to_string();
        genuine.renounced = TriState::Yes;
        let copy = make_record("0xbb", "FOO", 10_000.0, 12.0);

        let freshness = MapFreshness {
            creations: [("0xaa".to_string(), NOW - 20 * 3600)].into_iter().collect(),
        };
        let mut monitor = make_monitor_with_freshness(
            dir.path(),
            vec![genuine, copy],
            notifier.clone(),
            Box::new(freshness),
        );
        monitor.run_cycle(NOW).await.unwrap();

        let batches = notifier.batches.lock().unwrap();
        let projects = &batches[0].1;
        let find = |addr: &str| projects.iter().find(|(a, _, _)| a == addr).unwrap();

        let (_, score, rank) = find("0xaa");
        assert_eq!(*score, 12, "earliest-listing bonus must follow the validated time");
        assert_eq!(*rank, Some(TrustRank::Verified));

        let (_, score, rank) = find("0xbb");
        assert_eq!(*score, -1);
        assert_eq!(*rank, Some(TrustRank::LikelyCounterfeit));
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![make_record("0xaa", "FOO", 20_000.0, 2.0)];

        // 1. First process discovers and persists.
        let notifier = CollectingNotifier::default();
        let mut monitor = make_monitor(dir.path(), records.clone(), notifier.clone());
        monitor.run_cycle(NOW).await.unwrap();
        assert_eq!(notifier.batches.lock().unwrap().len(), 1);
        drop(monitor);

        // 2. A restarted process loads the store and stays quiet.
        let notifier = CollectingNotifier::default();
        let mut monitor = make_monitor(dir.path(), records, notifier.clone());
        let report = monitor.run_cycle(NOW + 600).await.unwrap();
        assert_eq!(report.notified, 0);
        assert!(notifier.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_move_to_archive() {
        let dir = tempfile::tempdir().unwrap();

        // Seed a store entry last notified 73h ago (window is 72h).
        let mut store = StateStore::load(dir.path().join("state.json")).unwrap();
        let mut old = make_record("0xold", "FOO", 20_000.0, 73.0);
        old.twitter = "foo".to_string();
        store.upsert(old, NOW - 73 * 3600);
        store.save().unwrap();
        drop(store);

        let notifier = CollectingNotifier::default();
        let mut monitor = make_monitor(dir.path(), Vec::new(), notifier);
        let report = monitor.run_cycle(NOW).await.unwrap();

        assert_eq!(report.lifecycle.expired, 1);
        assert_eq!(report.lifecycle.archived, 1);
        assert!(!monitor.store().contains("0xold"));

        let archive = Archive::load(
            dir.path().join("archive.json"),
            dir.path().join("index.json"),
        )
        .unwrap();
        assert!(archive.contains("0xold"));
    }

    #[tokio::test]
    async fn test_quality_filter_gates_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = CollectingNotifier::default();
        let records = vec![
            make_record("0xok", "GOOD", 20_000.0, 2.0),
            // Below the $5k liquidity floor.
            make_record("0xlow", "THIN", 1_000.0, 2.0),
            // Denylisted major.
            make_record("0xusdc", "USDC", 9_000_000.0, 2.0),
            // Too old.
            make_record("0xold", "AGED", 20_000.0, 80.0),
        ];
        let mut monitor = make_monitor(dir.path(), records, notifier.clone());
        let report = monitor.run_cycle(NOW).await.unwrap();

        assert_eq!(report.new_candidates, 1);
        let batches = notifier.batches.lock().unwrap();
        assert_eq!(batches[0].1[0].0, "0xok");
    }
}
