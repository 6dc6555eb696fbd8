//! GitHub Commit Leaderboard Backend
//!
//! Ranks registered GitHub users by recent commit activity. Upstream calls are
//! memoized in SQLite and gated on the remaining API quota.

mod aggregation;
mod api;
mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod github;
mod leaderboard;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aggregation::CommitAggregator;
use cache::CacheStore;
use config::Config;
use db::Repository;
use github::{GitHubClient, GitHubError, GitHubFetcher};
use leaderboard::LeaderboardBuilder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub cache: Arc<CacheStore>,
    pub github: Arc<GitHubFetcher>,
    pub aggregator: Arc<CommitAggregator>,
    pub leaderboard: Arc<LeaderboardBuilder>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the store, cache, fetchers, and builders over one pool.
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, GitHubError> {
        let repo = Repository::new(pool.clone());
        let cache = CacheStore::new(pool);
        let client = GitHubClient::new(&config.github)?;

        let fetcher = GitHubFetcher::new(
            client.clone(),
            cache.clone(),
            config.cache_ttl,
            config.aggregation,
        );
        let aggregator = CommitAggregator::new(
            fetcher.clone(),
            cache.clone(),
            config.cache_ttl.aggregate,
            config.aggregation,
        );
        let leaderboard = LeaderboardBuilder::new(
            repo.clone(),
            aggregator.clone(),
            client,
            cache.clone(),
            config.leaderboard,
            config.cache_ttl.aggregate,
        );

        Ok(Self {
            repo: Arc::new(repo),
            cache: Arc::new(cache),
            github: Arc::new(fetcher),
            aggregator: Arc::new(aggregator),
            leaderboard: Arc::new(leaderboard),
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GitHub Commit Leaderboard");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upstream API: {}", config.github.api_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_key.is_none() {
        tracing::warn!("No admin key configured (LEADERBOARD_ADMIN_KEY). Admin routes are open!");
    }
    if config.github.token.is_none() {
        tracing::warn!("No GITHUB_TOKEN set; upstream quota will be the anonymous limit");
    }

    let pool = db::init_database(&config.db_path).await?;
    let bind_addr = config.bind_addr;
    let state = AppState::new(pool, config)?;

    match state.github.client().check_budget().await {
        Some(budget) => tracing::info!(
            remaining = budget.remaining,
            limit = budget.limit,
            reset_at = %budget.reset_at,
            "upstream rate limit"
        ),
        None => tracing::warn!("upstream rate limit unknown at startup"),
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_key = state.config.admin_key.clone();

    let admin_routes = Router::new()
        .route("/leaderboard", post(api::admin_leaderboard))
        .route("/users/{id}", delete(api::delete_user))
        .route("/cache-stats", get(api::cache_stats))
        .route("/clear-cache", post(api::clear_cache))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(admin_key.clone(), req, next)
        }));

    let api_routes = Router::new()
        .route("/register", post(api::register))
        .route("/leaderboard", get(api::get_leaderboard))
        .route("/users/{username}/commits", get(api::user_commits))
        .route("/stats", get(api::get_stats))
        .route("/rate-limit", get(api::get_rate_limit))
        .nest("/admin", admin_routes);

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod test_support;
