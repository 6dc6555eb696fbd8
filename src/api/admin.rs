//! Admin endpoints. Mounted behind the admin key layer.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, window_days, ApiResult};
use crate::cache::CacheStatistics;
use crate::models::{LeaderboardEntry, User};
use crate::AppState;

/// Request body for the windowed leaderboard.
#[derive(Debug, Default, Deserialize)]
pub struct AdminLeaderboardRequest {
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

/// Result of removing a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedUser {
    pub user: User,
    pub purged_cache_entries: u64,
}

/// Result of clearing the cache.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedCache {
    pub removed_entries: u64,
}

/// POST /api/admin/leaderboard - Leaderboard for an arbitrary window.
pub async fn admin_leaderboard(
    State(state): State<AppState>,
    Json(request): Json<AdminLeaderboardRequest>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let days = window_days(request.days, state.config.leaderboard.default_window_days)?;
    success(state.leaderboard.build_for_window(days, request.refresh).await?)
}

/// DELETE /api/admin/users/:id - Remove a user and every cache entry naming them.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedUser> {
    let user = state.repo.delete_user(&id).await?;
    let purged = state
        .cache
        .delete_matching(&user.username.to_lowercase())
        .await?;

    tracing::info!(username = %user.username, purged, "admin deleted user");
    success(DeletedUser {
        user,
        purged_cache_entries: purged,
    })
}

/// GET /api/admin/cache-stats - Describe cache contents.
pub async fn cache_stats(State(state): State<AppState>) -> ApiResult<CacheStatistics> {
    success(state.cache.statistics().await?)
}

/// POST /api/admin/clear-cache - Empty the cache.
pub async fn clear_cache(State(state): State<AppState>) -> ApiResult<ClearedCache> {
    let removed = state.cache.clear_all().await?;
    tracing::info!(removed, "admin cleared cache");
    success(ClearedCache {
        removed_entries: removed,
    })
}
