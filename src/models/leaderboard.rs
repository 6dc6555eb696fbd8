//! Ranked leaderboard rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub public_repos: i64,
    pub followers: i64,
    pub commit_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_days: Option<i64>,
    /// 1-based position; 1 is the highest commit count
    pub rank: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntry {
    pub fn ranked(user: User, rank: usize) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            public_repos: user.public_repos,
            followers: user.followers,
            commit_count: user.commit_count,
            window_days: user.window_days,
            rank,
            last_refreshed_at: user.last_refreshed_at,
        }
    }
}

/// Assign ranks in the given order, without sorting.
pub fn rank_in_order(users: Vec<User>) -> Vec<LeaderboardEntry> {
    users
        .into_iter()
        .enumerate()
        .map(|(index, user)| LeaderboardEntry::ranked(user, index + 1))
        .collect()
}

/// Sort by commit count, highest first, and assign ranks.
///
/// The sort is stable: equal counts keep their input order.
pub fn rank_by_commits(mut users: Vec<User>) -> Vec<LeaderboardEntry> {
    users.sort_by(|a, b| b.commit_count.cmp(&a.commit_count));
    rank_in_order(users)
}
