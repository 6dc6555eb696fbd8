//! Upstream payloads and the trimmed summaries kept in the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public profile of a GitHub account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubProfile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub public_repos: i64,
    #[serde(default)]
    pub followers: i64,
}

/// A repository owned by the identity being aggregated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    pub name: String,
    pub owner_login: String,
    pub is_fork: bool,
    pub is_archived: bool,
    pub updated_at: DateTime<Utc>,
}

impl RepositorySummary {
    /// Whether the repository can hold commits made at or after `window_start`.
    ///
    /// Archived repositories and ones untouched since before the window cannot.
    pub fn may_have_commits_since(&self, window_start: DateTime<Utc>) -> bool {
        !self.is_archived && self.updated_at >= window_start
    }
}

/// A commit attributed to the identity being aggregated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub sha: String,
    pub author_login: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Upstream request quota.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateBudget {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOwner {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRepository {
    pub name: String,
    pub owner: RawOwner,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<RawRepository> for RepositorySummary {
    fn from(raw: RawRepository) -> Self {
        Self {
            name: raw.name,
            owner_login: raw.owner.login,
            is_fork: raw.fork,
            is_archived: raw.archived,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawAuthor {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSignature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCommitDetail {
    #[serde(default)]
    pub author: Option<RawSignature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCommit {
    pub sha: String,
    #[serde(default)]
    pub author: Option<RawAuthor>,
    #[serde(default)]
    pub commit: RawCommitDetail,
}

impl RawCommit {
    /// Convert into a record if the linked account is `identity`, ignoring case.
    pub fn authored_by(self, identity: &str) -> Option<CommitRecord> {
        let login = self.author?.login?;
        if !login.eq_ignore_ascii_case(identity) {
            return None;
        }
        Some(CommitRecord {
            sha: self.sha,
            author_login: login,
            timestamp: self.commit.author.and_then(|a| a.date),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRate {
    pub limit: u64,
    pub remaining: u64,
    pub reset: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRateLimit {
    pub rate: RawRate,
}

impl From<RawRateLimit> for RateBudget {
    fn from(raw: RawRateLimit) -> Self {
        Self {
            limit: raw.rate.limit,
            remaining: raw.rate.remaining,
            reset_at: DateTime::from_timestamp(raw.rate.reset, 0).unwrap_or_else(|| {
                tracing::warn!(reset = raw.rate.reset, "rate limit reset out of range");
                Utc::now()
            }),
        }
    }
}
