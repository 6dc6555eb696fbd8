//! Deterministic cache keys.
//!
//! Identities are lower-cased so one user's entries can be purged by name.

use chrono::NaiveDate;

pub fn profile(identity: &str) -> String {
    format!("user_{}", identity.to_lowercase())
}

pub fn repositories(identity: &str) -> String {
    format!("repos_{}", identity.to_lowercase())
}

/// Commit listing for one repository and window; an open upper bound encodes as `null`.
pub fn commits(identity: &str, repo: &str, since: &str, until: Option<&str>) -> String {
    format!(
        "commits_{}_{}_{}_{}",
        identity.to_lowercase(),
        repo,
        since,
        until.unwrap_or("null")
    )
}

/// Aggregate count; keyed by the window's start date so a day's calls share it.
pub fn aggregate(identity: &str, window_days: u32, window_start: NaiveDate) -> String {
    format!(
        "user_commits_{}_{}_{}",
        identity.to_lowercase(),
        window_days,
        window_start.format("%Y-%m-%d")
    )
}

pub fn leaderboard(window_days: u32) -> String {
    format!("leaderboard_{}", window_days)
}
