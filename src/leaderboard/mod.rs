//! Leaderboard materialization.
//!
//! Decides whether stored counts are fresh enough, gates refreshes on the
//! upstream rate budget, runs per-user aggregations with bounded concurrency,
//! and ranks the result.

use std::time::Duration;

use chrono::Utc;
use futures::{stream, StreamExt};
use tracing::{info, warn};

use crate::aggregation::{CommitAggregator, TallyStatus};
use crate::cache::{keys, CacheStore};
use crate::config::LeaderboardSettings;
use crate::db::Repository;
use crate::errors::AppError;
use crate::github::{GitHubClient, RateBudget};
use crate::models::{rank_by_commits, rank_in_order, LeaderboardEntry, User};

/// Outcome of a refresh attempt.
enum Refresh {
    /// Budget too low; the users are returned untouched.
    Skipped(Vec<User>),
    Completed(Vec<User>),
}

/// Builds ranked leaderboards from the registered users.
#[derive(Clone)]
pub struct LeaderboardBuilder {
    repo: Repository,
    aggregator: CommitAggregator,
    client: GitHubClient,
    cache: CacheStore,
    settings: LeaderboardSettings,
    snapshot_max_age: Duration,
}

impl LeaderboardBuilder {
    pub fn new(
        repo: Repository,
        aggregator: CommitAggregator,
        client: GitHubClient,
        cache: CacheStore,
        settings: LeaderboardSettings,
        snapshot_max_age: Duration,
    ) -> Self {
        Self {
            repo,
            aggregator,
            client,
            cache,
            settings,
            snapshot_max_age,
        }
    }

    /// Public leaderboard.
    ///
    /// Refreshes when forced or when any user's stored count is missing, stale,
    /// or was computed for another window, then persists the new counts. When
    /// the budget check vetoes a refresh the stored users are returned ranked in
    /// stored order.
    ///
    /// Only the default window is persisted; other windows are served from
    /// [`build_for_window`](Self::build_for_window).
    pub async fn build(
        &self,
        window_days: u32,
        force_refresh: bool,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        if window_days != self.settings.default_window_days {
            return self.build_for_window(window_days, force_refresh).await;
        }

        let users = self.repo.list_users().await?;
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let stale_after = chrono::Duration::from_std(self.settings.stale_after)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let window = i64::from(window_days);
        let should_refresh = force_refresh
            || users.iter().any(|u| {
                u.is_stale(now, stale_after) || u.window_days.is_some_and(|w| w != window)
            });
        if !should_refresh {
            return Ok(rank_by_commits(users));
        }

        info!(users = users.len(), window_days, "refreshing commit data");
        match self.refresh(users, window_days).await {
            Refresh::Skipped(users) => Ok(rank_in_order(users)),
            Refresh::Completed(users) => {
                self.repo.save_refresh(&users).await?;
                Ok(rank_by_commits(users))
            }
        }
    }

    /// Leaderboard for an arbitrary window, served from a cached snapshot.
    ///
    /// Results are kept in the snapshot only; stored per-user counts are left
    /// to the public leaderboard's window.
    pub async fn build_for_window(
        &self,
        window_days: u32,
        force_refresh: bool,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let key = keys::leaderboard(window_days);
        if !force_refresh {
            if let Some(entries) = self.cache.get(&key, self.snapshot_max_age).await? {
                return Ok(entries);
            }
        }

        let users = self.repo.list_users().await?;
        if users.is_empty() {
            return Ok(Vec::new());
        }

        info!(users = users.len(), window_days, "refreshing windowed leaderboard");
        match self.refresh(users, window_days).await {
            Refresh::Skipped(users) => Ok(rank_in_order(users)),
            Refresh::Completed(users) => {
                let entries = rank_by_commits(users);
                self.cache.set(&key, &entries).await?;
                Ok(entries)
            }
        }
    }

    async fn refresh(&self, users: Vec<User>, window_days: u32) -> Refresh {
        let budget = self.client.check_budget().await;
        let reserve = users.len() as u64 * self.settings.budget_per_identity;

        if let Some(budget) = &budget {
            if budget.remaining < reserve {
                warn!(
                    remaining = budget.remaining,
                    required = reserve,
                    "insufficient API calls remaining, using stored data"
                );
                return Refresh::Skipped(users);
            }
        }

        let concurrency = refresh_concurrency(&self.settings, budget.as_ref());
        let refreshed: Vec<User> = stream::iter(users)
            .map(|user| self.refresh_user(user, window_days))
            .buffered(concurrency)
            .collect()
            .await;

        Refresh::Completed(refreshed)
    }

    async fn refresh_user(&self, mut user: User, window_days: u32) -> User {
        let tally = self.aggregator.aggregate(&user.username, window_days).await;

        if tally.status == TallyStatus::Failed {
            warn!(
                identity = %user.username,
                previous = user.commit_count,
                "keeping previous commit count"
            );
        } else {
            user.commit_count = i64::try_from(tally.count).unwrap_or(i64::MAX);
            user.window_days = Some(i64::from(window_days));
        }
        user.last_refreshed_at = Some(Utc::now());
        user
    }
}

/// Concurrent aggregations allowed for a refresh: the configured cap,
/// narrowed to what the remaining budget can cover.
fn refresh_concurrency(settings: &LeaderboardSettings, budget: Option<&RateBudget>) -> usize {
    let cap = settings.max_concurrent_refreshes.max(1);
    match budget {
        Some(budget) if settings.budget_per_identity > 0 => {
            let affordable = budget.remaining / settings.budget_per_identity;
            usize::try_from(affordable).unwrap_or(usize::MAX).clamp(1, cap)
        }
        _ => cap,
    }
}
