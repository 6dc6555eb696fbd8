//! Public leaderboard and quota endpoints.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{success, window_days, ApiResult};
use crate::errors::AppError;
use crate::github::RateBudget;
use crate::models::LeaderboardEntry;
use crate::AppState;

/// Leaderboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub refresh: bool,
    #[serde(default)]
    pub days: Option<u32>,
}

/// GET /api/leaderboard - Ranked users, refreshing stale counts.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let days = window_days(query.days, state.config.leaderboard.default_window_days)?;
    success(state.leaderboard.build(days, query.refresh).await?)
}

/// GET /api/rate-limit - Current upstream quota.
pub async fn get_rate_limit(State(state): State<AppState>) -> ApiResult<RateBudget> {
    match state.github.client().check_budget().await {
        Some(budget) => success(budget),
        None => Err(AppError::Upstream(
            "Unable to fetch rate limit".to_string(),
        )),
    }
}
