//! Configuration module for the leaderboard backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Cache windows and refresh thresholds are tunable rather than hard-coded.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Largest page size the upstream listing endpoints accept.
pub const UPSTREAM_PAGE_SIZE: usize = 100;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret guarding the admin routes
    pub admin_key: Option<String>,
    /// Path to SQLite database file (users and cache)
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub github: GitHubSettings,
    pub cache_ttl: CacheTtl,
    pub aggregation: AggregationSettings,
    pub leaderboard: LeaderboardSettings,
}

/// Upstream API connection settings.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            user_agent: "GitHub-Leaderboard-App".to_string(),
        }
    }
}

/// Maximum age of each cached upstream result.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub profile: Duration,
    pub repositories: Duration,
    pub commits: Duration,
    /// Aggregate counts and admin leaderboard snapshots
    pub aggregate: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            profile: Duration::from_millis(1_800_000),
            repositories: Duration::from_millis(1_800_000),
            commits: Duration::from_millis(900_000),
            aggregate: Duration::from_millis(1_800_000),
        }
    }
}

/// Pagination and throttling knobs for a single aggregation.
#[derive(Debug, Clone, Copy)]
pub struct AggregationSettings {
    pub repo_batch_size: usize,
    pub batch_pause: Duration,
    pub page_pause: Duration,
    pub max_pages: u32,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            repo_batch_size: 5,
            batch_pause: Duration::from_millis(200),
            page_pause: Duration::from_millis(100),
            max_pages: 10,
        }
    }
}

/// Leaderboard refresh policy.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardSettings {
    pub default_window_days: u32,
    pub stale_after: Duration,
    pub budget_per_identity: u64,
    pub registration_min_budget: u64,
    pub max_concurrent_refreshes: usize,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            stale_after: Duration::from_millis(3_600_000),
            budget_per_identity: 10,
            registration_min_budget: 10,
            max_concurrent_refreshes: 4,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let admin_key = env::var("LEADERBOARD_ADMIN_KEY").ok();

        let db_path = env::var("LEADERBOARD_DB_PATH")
            .unwrap_or_else(|_| "./data/leaderboard.sqlite".to_string())
            .into();

        let bind_addr: SocketAddr =
            parse_var("LEADERBOARD_BIND_ADDR", "127.0.0.1:3001".parse().ok())?;

        let log_level = env::var("LEADERBOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = GitHubSettings::default();
        let github = GitHubSettings {
            api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.api_url),
            token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            user_agent: defaults.user_agent,
        };

        let defaults = CacheTtl::default();
        let cache_ttl = CacheTtl {
            profile: parse_millis("LEADERBOARD_PROFILE_TTL_MS", defaults.profile)?,
            repositories: parse_millis("LEADERBOARD_REPOS_TTL_MS", defaults.repositories)?,
            commits: parse_millis("LEADERBOARD_COMMITS_TTL_MS", defaults.commits)?,
            aggregate: parse_millis("LEADERBOARD_AGGREGATE_TTL_MS", defaults.aggregate)?,
        };

        let defaults = AggregationSettings::default();
        let aggregation = AggregationSettings {
            repo_batch_size: parse_var(
                "LEADERBOARD_REPO_BATCH_SIZE",
                Some(defaults.repo_batch_size),
            )?
            .max(1),
            batch_pause: parse_millis("LEADERBOARD_BATCH_PAUSE_MS", defaults.batch_pause)?,
            page_pause: parse_millis("LEADERBOARD_PAGE_PAUSE_MS", defaults.page_pause)?,
            max_pages: parse_var("LEADERBOARD_MAX_PAGES", Some(defaults.max_pages))?.max(1),
        };

        let defaults = LeaderboardSettings::default();
        let leaderboard = LeaderboardSettings {
            default_window_days: parse_var(
                "LEADERBOARD_WINDOW_DAYS",
                Some(defaults.default_window_days),
            )?,
            stale_after: parse_millis("LEADERBOARD_STALE_AFTER_MS", defaults.stale_after)?,
            budget_per_identity: parse_var(
                "LEADERBOARD_BUDGET_PER_IDENTITY",
                Some(defaults.budget_per_identity),
            )?,
            registration_min_budget: parse_var(
                "LEADERBOARD_REGISTRATION_MIN_BUDGET",
                Some(defaults.registration_min_budget),
            )?,
            max_concurrent_refreshes: parse_var(
                "LEADERBOARD_MAX_CONCURRENT_REFRESHES",
                Some(defaults.max_concurrent_refreshes),
            )?
            .max(1),
        };

        Ok(Self {
            admin_key,
            db_path,
            bind_addr,
            log_level,
            github,
            cache_ttl,
            aggregation,
            leaderboard,
        })
    }
}

/// Read and parse a variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: Option<T>) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => default.ok_or(ConfigError::Invalid {
            name,
            value: String::new(),
        }),
    }
}

fn parse_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_var(name, Some(default_ms)).map(Duration::from_millis)
}
