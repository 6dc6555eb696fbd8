//! Shared fixtures for unit and integration tests.
//!
//! [`MockGitHub`] is an in-process stand-in for the upstream API: an axum server
//! on an ephemeral port serving canned responses and counting hits per path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{AggregationSettings, Config, GitHubSettings, LeaderboardSettings};
use crate::db::init_database;
use crate::AppState;

type Canned = (u16, Value);

#[derive(Default)]
struct MockState {
    users: HashMap<String, Canned>,
    repo_pages: HashMap<(String, u32), Canned>,
    commits: HashMap<(String, String), Canned>,
    rate_limit: Option<Canned>,
    commit_delay: Duration,
    commits_in_flight: usize,
    peak_commits_in_flight: usize,
    hits: HashMap<String, usize>,
    queries: HashMap<String, HashMap<String, String>>,
}

/// Programmable fake of the GitHub REST endpoints.
#[derive(Clone, Default)]
pub struct MockGitHub {
    state: Arc<Mutex<MockState>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, login: &str) {
        let profile = json!({
            "login": login,
            "name": format!("{login} display"),
            "avatar_url": format!("https://avatars.example/{login}"),
            "public_repos": 4,
            "followers": 2
        });
        self.lock().users.insert(login.to_lowercase(), (200, profile));
    }

    pub fn set_user_status(&self, login: &str, status: u16) {
        self.lock()
            .users
            .insert(login.to_lowercase(), (status, json!({ "message": "canned" })));
    }

    pub fn set_repo_page(&self, login: &str, page: u32, status: u16, body: Value) {
        self.lock()
            .repo_pages
            .insert((login.to_lowercase(), page), (status, body));
    }

    pub fn set_commits(&self, owner: &str, repo: &str, status: u16, body: Value) {
        self.lock()
            .commits
            .insert((owner.to_lowercase(), repo.to_string()), (status, body));
    }

    pub fn set_rate_limit(&self, remaining: u64, limit: u64) {
        let reset = Utc::now().timestamp() + 3600;
        self.lock().rate_limit = Some((
            200,
            json!({ "rate": { "limit": limit, "remaining": remaining, "reset": reset } }),
        ));
    }

    /// Hold every commit listing response for `delay` before answering.
    pub fn set_commit_delay(&self, delay: Duration) {
        self.lock().commit_delay = delay;
    }

    /// Most commit listing requests that were being served at the same time.
    pub fn peak_commits_in_flight(&self) -> usize {
        self.lock().peak_commits_in_flight
    }

    /// Number of requests served for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.lock().hits.get(path).copied().unwrap_or(0)
    }

    /// Query parameters of the most recent request to `path`.
    pub fn last_query(&self, path: &str) -> Option<HashMap<String, String>> {
        self.lock().queries.get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Serve the mock and return its base URL.
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/users/{login}", get(mock_user))
            .route("/users/{login}/repos", get(mock_repos))
            .route("/repos/{owner}/{repo}/commits", get(mock_commits))
            .route("/rate_limit", get(mock_rate_limit))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn record(&self, uri: &Uri, query: HashMap<String, String>) {
        let mut state = self.lock();
        *state.hits.entry(uri.path().to_string()).or_default() += 1;
        state.queries.insert(uri.path().to_string(), query);
    }
}

fn canned(response: Option<Canned>, fallback: Canned) -> Response {
    let (status, body) = response.unwrap_or(fallback);
    let status = StatusCode::from_u16(status).unwrap();
    (status, Json(body)).into_response()
}

async fn mock_user(
    State(mock): State<MockGitHub>,
    Path(login): Path<String>,
    uri: Uri,
) -> Response {
    mock.record(&uri, HashMap::new());
    let response = mock.lock().users.get(&login.to_lowercase()).cloned();
    canned(response, (404, json!({ "message": "Not Found" })))
}

async fn mock_repos(
    State(mock): State<MockGitHub>,
    Path(login): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    let page = query
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1u32);
    mock.record(&uri, query);
    let response = mock
        .lock()
        .repo_pages
        .get(&(login.to_lowercase(), page))
        .cloned();
    canned(response, (200, json!([])))
}

async fn mock_commits(
    State(mock): State<MockGitHub>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    mock.record(&uri, query);
    let delay = {
        let mut state = mock.lock();
        state.commits_in_flight += 1;
        state.peak_commits_in_flight = state.peak_commits_in_flight.max(state.commits_in_flight);
        state.commit_delay
    };
    tokio::time::sleep(delay).await;

    let response = {
        let mut state = mock.lock();
        state.commits_in_flight -= 1;
        state.commits.get(&(owner.to_lowercase(), repo)).cloned()
    };
    canned(response, (200, json!([])))
}

async fn mock_rate_limit(State(mock): State<MockGitHub>, uri: Uri) -> Response {
    mock.record(&uri, HashMap::new());
    let response = mock.lock().rate_limit.clone();
    canned(response, (500, json!({ "message": "unavailable" })))
}

/// Repository listing item as returned by `GET /users/{login}/repos`.
pub fn repo_json(
    name: &str,
    owner: &str,
    fork: bool,
    archived: bool,
    updated_at: DateTime<Utc>,
) -> Value {
    json!({
        "name": name,
        "owner": { "login": owner },
        "fork": fork,
        "archived": archived,
        "updated_at": updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    })
}

/// Commit listing item; `login` is `None` for commits with no linked account.
pub fn commit_json(sha: &str, login: Option<&str>, date: DateTime<Utc>) -> Value {
    json!({
        "sha": sha,
        "author": login.map(|l| json!({ "login": l })),
        "commit": { "author": { "date": date.to_rfc3339_opts(SecondsFormat::Secs, true) } }
    })
}

/// Configuration pointing at `api_url` with throttling pauses removed.
pub fn test_config(api_url: String, temp_dir: &TempDir, admin_key: Option<String>) -> Config {
    Config {
        admin_key,
        db_path: temp_dir.path().join("test.sqlite"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        github: GitHubSettings {
            api_url,
            ..GitHubSettings::default()
        },
        cache_ttl: Default::default(),
        aggregation: AggregationSettings {
            batch_pause: Duration::ZERO,
            page_pause: Duration::ZERO,
            ..AggregationSettings::default()
        },
        leaderboard: LeaderboardSettings::default(),
    }
}

/// Fully wired application state backed by a fresh database and `mock`.
pub async fn test_state(mock: &MockGitHub) -> (AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(mock.start().await, &temp_dir, None);
    let state = state_for(config).await;
    (state, temp_dir)
}

pub async fn state_for(config: Config) -> AppState {
    let pool = init_database(&config.db_path).await.unwrap();
    AppState::new(pool, config).unwrap()
}
