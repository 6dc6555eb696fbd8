//! Database repository for registered users.
//!
//! Commit counts and refresh timestamps are written only by leaderboard refreshes.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::AppError;
use crate::github::GitHubProfile;
use crate::models::{Stats, User};

const USER_COLUMNS: &str = "id, username, display_name, avatar_url, public_repos, followers, \
     registered_at, commit_count, window_days, last_refreshed_at";

/// Database repository for user records.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all users in registration order.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY registered_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by username, ignoring case.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Register a user from their upstream profile.
    pub async fn create_user(&self, profile: &GitHubProfile) -> Result<User, AppError> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: profile.login.clone(),
            display_name: profile
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| profile.login.clone()),
            avatar_url: profile.avatar_url.clone(),
            public_repos: profile.public_repos,
            followers: profile.followers,
            registered_at: Utc::now(),
            commit_count: 0,
            window_days: None,
            last_refreshed_at: None,
        };

        let result = sqlx::query(
            "INSERT INTO users (id, username, display_name, avatar_url, public_repos, followers, registered_at, commit_count) VALUES (?, ?, ?, ?, ?, ?, ?, 0)"
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(user.public_repos)
        .bind(user.followers)
        .bind(user.registered_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "User already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a user, returning the removed record.
    pub async fn delete_user(&self, id: &str) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(existing)
    }

    /// Persist refreshed counts for many users in one transaction.
    pub async fn save_refresh(&self, users: &[User]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for user in users {
            sqlx::query(
                "UPDATE users SET commit_count = ?, window_days = ?, last_refreshed_at = ? WHERE id = ?",
            )
            .bind(user.commit_count)
            .bind(user.window_days)
            .bind(user.last_refreshed_at)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Totals across all users.
    pub async fn stats(&self) -> Result<Stats, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_users, COALESCE(SUM(commit_count), 0) AS total_commits FROM users",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Stats {
            total_users: row.get("total_users"),
            total_commits: row.get("total_commits"),
            generated_at: Utc::now(),
        })
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
        public_repos: row.get("public_repos"),
        followers: row.get("followers"),
        registered_at: row.get::<DateTime<Utc>, _>("registered_at"),
        commit_count: row.get("commit_count"),
        window_days: row.get("window_days"),
        last_refreshed_at: row.get::<Option<DateTime<Utc>>, _>("last_refreshed_at"),
    }
}
