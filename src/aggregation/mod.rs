//! Commit aggregation across all of a user's repositories.
//!
//! Repositories are fetched in fixed-size batches: concurrent within a batch,
//! sequential across batches, with a pause in between to stay under abuse limits.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{keys, CacheStore};
use crate::config::AggregationSettings;
use crate::github::{GitHubFetcher, RepositorySummary};

/// How much of the upstream data an aggregate is based on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TallyStatus {
    /// Every repository in the window was counted.
    Complete,
    /// Some repositories or listing pages could not be read; the count is a lower bound.
    Partial,
    /// The repository listing itself failed; the count is zero and meaningless.
    Failed,
}

/// Commit count for one identity over one window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitTally {
    pub identity: String,
    pub window_days: u32,
    pub count: u64,
    pub window_start: DateTime<Utc>,
    pub status: TallyStatus,
}

/// Cached form of a tally.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTally {
    count: u64,
    status: TallyStatus,
}

/// Counts commits for an identity, memoizing counted results.
#[derive(Clone)]
pub struct CommitAggregator {
    fetcher: GitHubFetcher,
    cache: CacheStore,
    max_age: Duration,
    settings: AggregationSettings,
}

impl CommitAggregator {
    pub fn new(
        fetcher: GitHubFetcher,
        cache: CacheStore,
        max_age: Duration,
        settings: AggregationSettings,
    ) -> Self {
        Self {
            fetcher,
            cache,
            max_age,
            settings,
        }
    }

    /// Count commits by `identity` over the trailing `window_days`.
    ///
    /// Never fails. Upstream problems downgrade the tally's status instead.
    /// Complete and partial tallies are cached with their status; a failed
    /// listing is not.
    pub async fn aggregate(&self, identity: &str, window_days: u32) -> CommitTally {
        let window_end = Utc::now();
        let window_start = window_end - chrono::Duration::days(i64::from(window_days));
        let key = keys::aggregate(identity, window_days, window_start.date_naive());

        match self.cache.get::<StoredTally>(&key, self.max_age).await {
            Ok(Some(stored)) => {
                return CommitTally {
                    identity: identity.to_string(),
                    window_days,
                    count: stored.count,
                    window_start,
                    status: stored.status,
                };
            }
            Ok(None) => {}
            Err(e) => warn!(identity, error = %e, "aggregate cache read failed"),
        }

        info!(
            identity,
            since = %window_start,
            until = %window_end,
            "calculating commits"
        );
        let (count, status) = self.count_commits(identity, window_start, window_end).await;

        if status != TallyStatus::Failed {
            if let Err(e) = self.cache.set(&key, &StoredTally { count, status }).await {
                warn!(identity, error = %e, "aggregate cache write failed");
            }
        }

        CommitTally {
            identity: identity.to_string(),
            window_days,
            count,
            window_start,
            status,
        }
    }

    async fn count_commits(
        &self,
        identity: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> (u64, TallyStatus) {
        let listing = match self.fetcher.list_owned_repositories(identity).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(identity, error = %e, "error calculating commits; counting zero");
                return (0, TallyStatus::Failed);
            }
        };

        let active: Vec<&RepositorySummary> = listing
            .repositories
            .iter()
            .filter(|repo| repo.may_have_commits_since(window_start))
            .collect();
        debug!(
            identity,
            total = listing.repositories.len(),
            active = active.len(),
            "skipping archived and untouched repositories"
        );

        let mut degraded = listing.truncated;
        let mut total = 0u64;
        for (index, batch) in active.chunks(self.settings.repo_batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.batch_pause).await;
            }

            let results = join_all(batch.iter().map(|repo| {
                self.fetcher.try_fetch_repository_commits(
                    identity,
                    &repo.name,
                    window_start,
                    Some(window_end),
                )
            }))
            .await;

            for (repo, result) in batch.iter().zip(results) {
                match result {
                    Ok(commits) => {
                        debug!(identity, repo = %repo.name, commits = commits.len(), "counted");
                        total += commits.len() as u64;
                    }
                    Err(_) => degraded = true,
                }
            }
        }

        info!(
            identity,
            total,
            repos = active.len(),
            degraded,
            "total commits"
        );
        let status = if degraded {
            TallyStatus::Partial
        } else {
            TallyStatus::Complete
        };
        (total, status)
    }
}
