//! Monitor configuration from environment variables
//!
//! Loaded once at startup with sensible defaults; every threshold the
//! engine uses lives here so components stay free of ambient globals.

use std::env;
use std::path::PathBuf;

/// Symbols of majors/stablecoins that never count as new discoveries.
const DEFAULT_DENYLIST: &[&str] = &[
    "cbbtc", "weth", "usdc", "usdt", "dai", "wbtc", "eth", "usdbc", "aero", "degen", "brett",
    "toshi",
];

/// Keywords marking thematically-interesting ("featured") assets.
const DEFAULT_FEATURED_KEYWORDS: &[&str] = &[
    "mine", "miner", "mining", "bot", "agent", "ai", "earn", "farm", "stake", "proof", "compute",
    "gpu", "hash", "reward", "epoch", "node", "botcoin", "agentcoin", "aibot", "automine",
];

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Seconds between scan cycles.
    pub scan_interval_secs: u64,

    /// State store snapshot path (atomic replace-on-write).
    pub state_path: PathBuf,

    /// Archive database path.
    pub archive_path: PathBuf,

    /// Derived archive index path.
    pub archive_index_path: PathBuf,

    /// Notification sink path.
    pub notify_path: PathBuf,

    /// Rolling observation window; previously-notified addresses are
    /// suppressed and kept live for this long.
    pub observation_window_hours: i64,

    /// Quality filter: maximum asset age.
    pub max_age_hours: f64,

    /// Quality filter: minimum pool liquidity in USD.
    pub min_liquidity: f64,

    /// Quality filter: minimum holder count (0 from a provider means
    /// unknown and is not penalized).
    pub min_holders: i64,

    /// Case-insensitive symbol denylist.
    pub denylist: Vec<String>,

    /// Featured-asset keywords (word-boundary matched).
    pub featured_keywords: Vec<String>,

    /// Global cap on freshness lookups per cycle.
    pub lookup_budget_per_cycle: u32,

    /// Cap on freshness lookups per duplicate-name cluster.
    pub lookup_budget_per_cluster: u32,

    /// Cap on safety re-checks per eligible cycle.
    pub safety_checks_per_cycle: u32,

    /// Safety re-checks run every Nth cycle.
    pub safety_check_interval_cycles: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 600,
            state_path: PathBuf::from("basewatch_state.json"),
            archive_path: PathBuf::from("archive/archive_db.json"),
            archive_index_path: PathBuf::from("archive/index.json"),
            notify_path: PathBuf::from("basewatch_notify.json"),
            observation_window_hours: 72,
            max_age_hours: 72.0,
            min_liquidity: 5_000.0,
            min_holders: 20,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            featured_keywords: DEFAULT_FEATURED_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lookup_budget_per_cycle: 20,
            lookup_budget_per_cluster: 5,
            safety_checks_per_cycle: 10,
            safety_check_interval_cycles: 3,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables (all optional):
    /// - `BASEWATCH_SCAN_INTERVAL_SECS` (default: 600)
    /// - `BASEWATCH_STATE_PATH` (default: basewatch_state.json)
    /// - `BASEWATCH_ARCHIVE_PATH` (default: archive/archive_db.json)
    /// - `BASEWATCH_ARCHIVE_INDEX_PATH` (default: archive/index.json)
    /// - `BASEWATCH_NOTIFY_PATH` (default: basewatch_notify.json)
    /// - `BASEWATCH_WINDOW_HOURS` (default: 72)
    /// - `BASEWATCH_MAX_AGE_HOURS` (default: 72)
    /// - `BASEWATCH_MIN_LIQUIDITY` (default: 5000)
    /// - `BASEWATCH_MIN_HOLDERS` (default: 20)
    /// - `BASEWATCH_LOOKUP_BUDGET` (default: 20)
    /// - `BASEWATCH_DENYLIST` (comma-separated symbols)
    /// - `BASEWATCH_FEATURED_KEYWORDS` (comma-separated keywords)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            scan_interval_secs: parse_env(
                "BASEWATCH_SCAN_INTERVAL_SECS",
                defaults.scan_interval_secs,
            ),
            state_path: env::var("BASEWATCH_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            archive_path: env::var("BASEWATCH_ARCHIVE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_path),
            archive_index_path: env::var("BASEWATCH_ARCHIVE_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_index_path),
            notify_path: env::var("BASEWATCH_NOTIFY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.notify_path),
            observation_window_hours: parse_env(
                "BASEWATCH_WINDOW_HOURS",
                defaults.observation_window_hours,
            ),
            max_age_hours: parse_env("BASEWATCH_MAX_AGE_HOURS", defaults.max_age_hours),
            min_liquidity: parse_env("BASEWATCH_MIN_LIQUIDITY", defaults.min_liquidity),
            min_holders: parse_env("BASEWATCH_MIN_HOLDERS", defaults.min_holders),
            denylist: parse_list("BASEWATCH_DENYLIST").unwrap_or(defaults.denylist),
            featured_keywords: parse_list("BASEWATCH_FEATURED_KEYWORDS")
                .unwrap_or(defaults.featured_keywords),
            lookup_budget_per_cycle: parse_env(
                "BASEWATCH_LOOKUP_BUDGET",
                defaults.lookup_budget_per_cycle,
            ),
            lookup_budget_per_cluster: defaults.lookup_budget_per_cluster,
            safety_checks_per_cycle: defaults.safety_checks_per_cycle,
            safety_check_interval_cycles: defaults.safety_check_interval_cycles,
        }
    }

    pub fn observation_window_secs(&self) -> i64 {
        self.observation_window_hours * 3600
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn parse_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|s| {
        s.split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect()
    })
}
