mod config;
mod error;

pub mod cycle;
pub mod enrich;
pub mod featured;
pub mod filter;
pub mod lifecycle;
pub mod merge;
pub mod normalizer;
pub mod notify;
pub mod record;
pub mod scoring;
pub mod sources;
pub mod store;

pub use config::MonitorConfig;
pub use error::MonitorError;

use {
    cycle::Monitor,
    enrich::{DexScreenerClient, HoneypotClient},
    lifecycle::Archive,
    notify::FileNotifier,
    sources::{DexScreenerSearchSource, GmgnPairsSource, GmgnRankSource, RecordSource},
    store::StateStore,
};

const CHAIN: &str = "base";
const CHAIN_ID: u64 = 8453;

pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[tokio::main]
pub async fn main() -> Result<(), MonitorError> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = MonitorConfig::from_env();

    log::info!("🚀 Starting BaseWatch...");
    log::info!("📊 Configuration:");
    log::info!("   scan interval: {}s", config.scan_interval_secs);
    log::info!("   state: {}", config.state_path.display());
    log::info!("   archive: {}", config.archive_path.display());
    log::info!(
        "   filter: liquidity ≥ ${:.0}, age ≤ {:.0}h, holders ≥ {}",
        config.min_liquidity,
        config.max_age_hours,
        config.min_holders
    );

    let store = StateStore::load(&config.state_path)?;
    let archive = Archive::load(&config.archive_path, &config.archive_index_path)?;
    log::info!(
        "💾 Loaded {} tracked, {} archived",
        store.len(),
        archive.total()
    );

    let sources: Vec<Box<dyn RecordSource>> = vec![
        Box::new(GmgnRankSource::new(CHAIN)?),
        Box::new(GmgnPairsSource::new(CHAIN)?),
        Box::new(DexScreenerSearchSource::new(
            CHAIN,
            config.featured_keywords.clone(),
        )?),
    ];

    let mut monitor = Monitor::new(
        config.clone(),
        sources,
        Box::new(DexScreenerClient::new()?),
        Box::new(HoneypotClient::new(CHAIN_ID)?),
        Box::new(FileNotifier::new(&config.notify_path)),
        store,
        archive,
    );

    let mut ticker =
        tokio::time::interval(std::time::Duration::from_secs(config.scan_interval_secs));

    loop {
        ticker.tick().await;
        let now = current_timestamp();
        match monitor.run_cycle(now).await {
            Ok(report) => {
                log::info!(
                    "✅ cycle done: {} fetched, {} merged, {} new ({} featured), \
                     {} notified, {} refreshed, {} safety-checked, {} lookups",
                    report.fetched,
                    report.merged,
                    report.new_candidates,
                    report.featured,
                    report.notified,
                    report.refreshed,
                    report.safety_checked,
                    report.lookups_spent,
                );
                if report.lifecycle.expired > 0 || report.lifecycle.cleaned > 0 {
                    log::info!(
                        "🗄️ lifecycle: {} expired ({} archived), {} cleaned",
                        report.lifecycle.expired,
                        report.lifecycle.archived,
                        report.lifecycle.cleaned
                    );
                }
            }
            // Keep running: in-memory state carries over and the next
            // cycle retries persistence.
            Err(e) => log::error!("❌ cycle failed: {}", e),
        }
    }
}
