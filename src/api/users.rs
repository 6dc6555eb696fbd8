//! Registration and per-user endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, window_days, ApiResult};
use crate::aggregation::CommitTally;
use crate::errors::AppError;
use crate::models::{is_valid_username, RegisterRequest, Stats, User};
use crate::AppState;

/// Optional look-back window.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    pub days: Option<u32>,
}

/// POST /api/register - Register a GitHub user.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<User> {
    let username = request.username.trim();
    if !is_valid_username(username) {
        return Err(AppError::Validation(
            "Invalid GitHub username format".to_string(),
        ));
    }

    if let Some(budget) = state.github.client().check_budget().await {
        if budget.remaining < state.config.leaderboard.registration_min_budget {
            return Err(AppError::RateLimited {
                message: "GitHub API rate limit low. Please try again later.".to_string(),
                reset_at: Some(budget.reset_at),
            });
        }
    }

    let profile = state.github.fetch_user_profile(username).await?;

    if state.repo.find_by_username(&profile.login).await?.is_some() {
        return Err(AppError::Conflict("User already registered".to_string()));
    }
    let user = state.repo.create_user(&profile).await?;

    tracing::info!(username = %user.username, "user registered");
    success(user)
}

/// GET /api/users/:username/commits - Commit tally for one user.
pub async fn user_commits(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<CommitTally> {
    if !is_valid_username(&username) {
        return Err(AppError::Validation(
            "Invalid GitHub username format".to_string(),
        ));
    }
    let days = window_days(query.days, state.config.leaderboard.default_window_days)?;

    success(state.aggregator.aggregate(&username, days).await)
}

/// GET /api/stats - Totals across all users.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Stats> {
    success(state.repo.stats().await?)
}
