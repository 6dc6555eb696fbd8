//! REST API module.
//!
//! Handlers are thin: they validate input and delegate to the fetchers,
//! aggregator, and leaderboard builder held in [`AppState`](crate::AppState).

mod admin;
mod leaderboard;
mod users;

pub use admin::*;
pub use leaderboard::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Longest look-back window accepted from clients.
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Resolve an optional `days` parameter against the configured default.
pub fn window_days(requested: Option<u32>, default: u32) -> Result<u32, AppError> {
    match requested.unwrap_or(default) {
        days @ 1..=MAX_WINDOW_DAYS => Ok(days),
        days => Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_WINDOW_DAYS}, got {days}"
        ))),
    }
}
