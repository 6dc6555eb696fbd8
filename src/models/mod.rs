//! Data models for the leaderboard application.
//!
//! Field names serialize as camelCase for the frontend.

mod leaderboard;
mod user;

pub use leaderboard::*;
pub use user::*;
