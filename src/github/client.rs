//! Thin HTTP client for the handful of GitHub endpoints the leaderboard uses.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use super::models::{RawCommit, RawRateLimit, RawRepository};
use super::{GitHubError, GitHubProfile, RateBudget};
use crate::config::GitHubSettings;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Upstream API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header(header::ACCEPT, ACCEPT);

        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `GET /users/{identity}`.
    pub async fn user(&self, identity: &str) -> Result<GitHubProfile, GitHubError> {
        let resp = self.get(&format!("/users/{identity}")).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(GitHubError::NotFound),
            status => Ok(success(resp, status)?.json().await?),
        }
    }

    /// One page of `GET /users/{identity}/repos`, most recently updated first.
    pub(crate) async fn repositories_page(
        &self,
        identity: &str,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<RawRepository>, GitHubError> {
        let resp = self
            .get(&format!("/users/{identity}/repos"))
            .query(&[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sort", "updated".to_string()),
                ("type", "owner".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        Ok(success(resp, status)?.json().await?)
    }

    /// `GET /repos/{identity}/{repo}/commits` filtered to `identity` as author.
    pub(crate) async fn commits(
        &self,
        identity: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        per_page: usize,
    ) -> Result<Vec<RawCommit>, GitHubError> {
        let mut query = vec![
            ("author", identity.to_string()),
            ("since", iso_timestamp(since)),
            ("per_page", per_page.to_string()),
        ];
        if let Some(until) = until {
            query.push(("until", iso_timestamp(until)));
        }

        let resp = self
            .get(&format!("/repos/{identity}/{repo}/commits"))
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        Ok(success(resp, status)?.json().await?)
    }

    /// `GET /rate_limit`.
    pub async fn rate_limit(&self) -> Result<RateBudget, GitHubError> {
        let resp = self.get("/rate_limit").send().await?;
        let status = resp.status();
        let raw: RawRateLimit = success(resp, status)?.json().await?;
        Ok(raw.into())
    }

    /// Current quota, or `None` when it cannot be read.
    ///
    /// Never cached. Callers treat `None` as "unknown, proceed with caution".
    pub async fn check_budget(&self) -> Option<RateBudget> {
        match self.rate_limit().await {
            Ok(budget) => {
                debug!(
                    remaining = budget.remaining,
                    limit = budget.limit,
                    "rate budget checked"
                );
                Some(budget)
            }
            Err(e) => {
                warn!(error = %e, "unable to read upstream rate limit");
                None
            }
        }
    }
}

/// Map forbidden/too-many-requests to [`GitHubError::RateLimited`] and any
/// other non-success status to [`GitHubError::Upstream`].
fn success(resp: Response, status: StatusCode) -> Result<Response, GitHubError> {
    match status {
        s if s.is_success() => Ok(resp),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(GitHubError::RateLimited),
        s => Err(GitHubError::Upstream(s.as_u16())),
    }
}

/// Millisecond-precision UTC timestamp with a `Z` suffix.
pub(crate) fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
