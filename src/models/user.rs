//! Registered participant model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered GitHub user and their last stored commit count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub public_repos: i64,
    pub followers: i64,
    pub registered_at: DateTime<Utc>,
    pub commit_count: i64,
    /// Look-back window the stored count was computed for
    pub window_days: Option<i64>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the stored count is missing or older than `stale_after`.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: chrono::Duration) -> bool {
        match self.last_refreshed_at {
            None => true,
            Some(refreshed) => refreshed < now - stale_after,
        }
    }
}

/// Request body for registering a new participant.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
}

/// Aggregate figures over all registered users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: i64,
    pub total_commits: i64,
    pub generated_at: DateTime<Utc>,
}

/// Check a username against GitHub's login rules.
///
/// 1 to 39 ASCII alphanumerics or hyphens, not starting or ending with a hyphen.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 39
        && !username.starts_with('-')
        && !username.ends_with('-')
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
