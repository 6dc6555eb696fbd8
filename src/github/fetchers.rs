//! Cache-aware upstream accessors.
//!
//! Each fetcher checks the [`CacheStore`] first and only calls GitHub on a miss.
//! Cache read/write failures are logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::client::iso_timestamp;
use super::{CommitRecord, GitHubClient, GitHubError, GitHubProfile, RepositorySummary};
use crate::cache::{keys, CacheStore};
use crate::config::{AggregationSettings, CacheTtl, UPSTREAM_PAGE_SIZE};

/// Owned repositories, plus whether pagination stopped early on a rate limit.
///
/// Cached as a whole so a truncated listing stays flagged on later hits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryListing {
    pub repositories: Vec<RepositorySummary>,
    pub truncated: bool,
}

/// Read-through cached access to profiles, repositories, and commits.
#[derive(Clone)]
pub struct GitHubFetcher {
    client: GitHubClient,
    cache: CacheStore,
    ttl: CacheTtl,
    settings: AggregationSettings,
}

impl GitHubFetcher {
    pub fn new(
        client: GitHubClient,
        cache: CacheStore,
        ttl: CacheTtl,
        settings: AggregationSettings,
    ) -> Self {
        Self {
            client,
            cache,
            ttl,
            settings,
        }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Option<T> {
        match self.cache.get(key, max_age).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    async fn remember<T: Serialize + ?Sized>(&self, key: &str, payload: &T) {
        if let Err(e) = self.cache.set(key, payload).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Profile for `identity`. Errors are surfaced and never cached.
    pub async fn fetch_user_profile(&self, identity: &str) -> Result<GitHubProfile, GitHubError> {
        let key = keys::profile(identity);
        if let Some(profile) = self.cached(&key, self.ttl.profile).await {
            return Ok(profile);
        }

        let profile = self.client.user(identity).await?;
        self.remember(&key, &profile).await;
        Ok(profile)
    }

    /// Non-fork repositories owned by `identity`; empty on failure.
    pub async fn fetch_owned_repositories(&self, identity: &str) -> Vec<RepositorySummary> {
        self.list_owned_repositories(identity)
            .await
            .map(|listing| listing.repositories)
            .unwrap_or_default()
    }

    /// Paginate the owned repository listing.
    ///
    /// Stops on a short page, at the page cap, or on a rate limit. A rate limit
    /// keeps whatever was gathered and caches it as final. Any other failure
    /// abandons the listing without caching.
    pub async fn list_owned_repositories(
        &self,
        identity: &str,
    ) -> Result<RepositoryListing, GitHubError> {
        let key = keys::repositories(identity);
        if let Some(listing) = self.cached(&key, self.ttl.repositories).await {
            return Ok(listing);
        }

        let mut listing = RepositoryListing::default();
        for page in 1..=self.settings.max_pages {
            if page > 1 {
                tokio::time::sleep(self.settings.page_pause).await;
            }

            match self
                .client
                .repositories_page(identity, page, UPSTREAM_PAGE_SIZE)
                .await
            {
                Ok(batch) => {
                    let full_page = batch.len() >= UPSTREAM_PAGE_SIZE;
                    listing.repositories.extend(
                        batch
                            .into_iter()
                            .filter(|repo| !repo.fork)
                            .map(RepositorySummary::from),
                    );
                    if !full_page {
                        break;
                    }
                }
                Err(GitHubError::RateLimited) => {
                    warn!(identity, page, "rate limit hit while listing repositories");
                    listing.truncated = true;
                    break;
                }
                Err(e) => {
                    warn!(identity, page, error = %e, "repository listing failed");
                    return Err(e);
                }
            }
        }

        debug!(
            identity,
            count = listing.repositories.len(),
            "listed owned repositories"
        );
        self.remember(&key, &listing).await;
        Ok(listing)
    }

    /// Commits by `identity` in `repo` within the window. Never fails: any
    /// upstream problem yields an empty list.
    pub async fn fetch_repository_commits(
        &self,
        identity: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Vec<CommitRecord> {
        self.try_fetch_repository_commits(identity, repo, since, until)
            .await
            .unwrap_or_default()
    }

    /// Like [`fetch_repository_commits`](Self::fetch_repository_commits) but
    /// reports degraded outcomes so callers can flag partial results.
    ///
    /// An empty repository (409) is a genuine empty result, not an error.
    pub async fn try_fetch_repository_commits(
        &self,
        identity: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<CommitRecord>, GitHubError> {
        let since_param = iso_timestamp(since);
        let until_param = until.map(iso_timestamp);
        let key = keys::commits(identity, repo, &since_param, until_param.as_deref());
        if let Some(commits) = self.cached(&key, self.ttl.commits).await {
            return Ok(commits);
        }

        match self
            .client
            .commits(identity, repo, since, until, UPSTREAM_PAGE_SIZE)
            .await
        {
            Ok(raw) => {
                let commits: Vec<CommitRecord> = raw
                    .into_iter()
                    .filter_map(|commit| commit.authored_by(identity))
                    .collect();
                self.remember(&key, &commits).await;
                Ok(commits)
            }
            Err(GitHubError::Upstream(409)) => {
                debug!(identity, repo, "repository is empty");
                Ok(Vec::new())
            }
            Err(GitHubError::RateLimited) => {
                warn!(identity, repo, "rate limit hit while fetching commits");
                Err(GitHubError::RateLimited)
            }
            Err(e) => {
                warn!(identity, repo, error = %e, "commit listing failed");
                Err(e)
            }
        }
    }
}
