//! GitHub REST API access.
//!
//! [`GitHubClient`] speaks HTTP; [`GitHubFetcher`] layers the response cache and
//! the degrade-to-empty policy on top of it.

mod client;
mod fetchers;
mod models;

pub use client::GitHubClient;
pub use fetchers::{GitHubFetcher, RepositoryListing};
pub use models::*;

/// Failures reported by the upstream API client.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("GitHub user not found")]
    NotFound,
    #[error("GitHub API rate limit exceeded")]
    RateLimited,
    #[error("GitHub API error: {0}")]
    Upstream(u16),
    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),
}
