//! Persistent read-through cache for upstream responses.
//!
//! Entries live in the `cache_entries` table, one row per key. Writes are per-key
//! upserts, so concurrent writers never clobber each other's unrelated keys.
//! Stale entries are shadowed on read, not purged.

pub mod keys;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Per-entry figures reported by [`CacheStore::statistics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStats {
    pub key: String,
    pub stored_at: DateTime<Utc>,
    pub age_millis: i64,
    pub size_bytes: i64,
}

/// Snapshot of the cache contents, newest entries first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatistics {
    pub entry_count: usize,
    pub entries: Vec<CacheEntryStats>,
}

/// Key-value memoizer mapping a cache key to `(payload, stored_at)`.
#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the payload for `key` if it was stored less than `max_age` ago.
    ///
    /// A zero `max_age` never hits. Payloads that no longer decode as `T` are
    /// reported as absent.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        max_age: Duration,
    ) -> Result<Option<T>, AppError> {
        let row = sqlx::query("SELECT payload, stored_at FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_at: i64 = row.get("stored_at");
        let age = (now_millis() - stored_at).max(0);
        if u128::from(age.unsigned_abs()) >= max_age.as_millis() {
            return Ok(None);
        }

        let payload: String = row.get("payload");
        match serde_json::from_str(&payload) {
            Ok(value) => {
                tracing::debug!(key, age_ms = age, "cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache payload");
                Ok(None)
            }
        }
    }

    /// Store `payload` under `key`, replacing any previous entry and stamping now.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, payload: &T) -> Result<(), AppError> {
        let payload = serde_json::to_string(payload)?;

        sqlx::query(
            "INSERT INTO cache_entries (key, payload, stored_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, stored_at = excluded.stored_at",
        )
        .bind(key)
        .bind(&payload)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove every entry. Returns the number removed.
    pub async fn clear_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove every entry whose key contains `fragment`. Returns the number removed.
    pub async fn delete_matching(&self, fragment: &str) -> Result<u64, AppError> {
        if fragment.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM cache_entries WHERE instr(key, ?) > 0")
            .bind(fragment)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Describe every stored entry, stale ones included.
    pub async fn statistics(&self) -> Result<CacheStatistics, AppError> {
        let rows = sqlx::query(
            "SELECT key, stored_at, length(CAST(payload AS BLOB)) AS size_bytes \
             FROM cache_entries ORDER BY stored_at DESC, key",
        )
        .fetch_all(&self.pool)
        .await?;

        let now = now_millis();
        let entries: Vec<CacheEntryStats> = rows
            .iter()
            .map(|row| {
                let stored_at: i64 = row.get("stored_at");
                CacheEntryStats {
                    key: row.get("key"),
                    stored_at: stored_time(row.get("key"), stored_at),
                    age_millis: (now - stored_at).max(0),
                    size_bytes: row.get("size_bytes"),
                }
            })
            .collect();

        Ok(CacheStatistics {
            entry_count: entries.len(),
            entries,
        })
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn stored_time(key: &str, millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(|| {
        tracing::warn!(key, stored_at = millis, "cache timestamp out of range");
        DateTime::UNIX_EPOCH
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    const MINUTE: Duration = Duration::from_secs(60);

    async fn store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("cache.sqlite"))
            .await
            .unwrap();
        (CacheStore::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_get_returns_fresh_payload() {
        let (cache, _dir) = store().await;

        cache.set("repos_alice", &vec!["r1", "r2"]).await.unwrap();

        let hit: Option<Vec<String>> = cache.get("repos_alice", MINUTE).await.unwrap();
        assert_eq!(hit, Some(vec!["r1".to_string(), "r2".to_string()]));

        let miss: Option<Vec<String>> = cache.get("repos_bob", MINUTE).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_zero_max_age_never_hits() {
        let (cache, _dir) = store().await;

        cache.set("user_alice", &42).await.unwrap();

        let hit: Option<i64> = cache.get("user_alice", Duration::ZERO).await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_is_shadowed_not_purged() {
        let (cache, _dir) = store().await;

        cache.set("user_alice", &1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let hit: Option<i64> = cache
            .get("user_alice", Duration::from_millis(10))
            .await
            .unwrap();
        assert!(hit.is_none());

        let stats = cache.statistics().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert!(stats.entries[0].age_millis >= 10);
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_key() {
        let (cache, _dir) = store().await;

        cache.set("user_commits_alice", &3).await.unwrap();
        cache.set("user_commits_alice", &9).await.unwrap();

        let hit: Option<i64> = cache.get("user_commits_alice", MINUTE).await.unwrap();
        assert_eq!(hit, Some(9));
        assert_eq!(cache.statistics().await.unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn test_clear_all_empties_store() {
        let (cache, _dir) = store().await;

        cache.set("a", &1).await.unwrap();
        cache.set("b", &2).await.unwrap();

        assert_eq!(cache.clear_all().await.unwrap(), 2);
        assert_eq!(cache.statistics().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_delete_matching_removes_only_matching_keys() {
        let (cache, _dir) = store().await;

        cache.set("user_alice", &1).await.unwrap();
        cache.set("repos_alice", &2).await.unwrap();
        cache.set("user_bob", &3).await.unwrap();

        assert_eq!(cache.delete_matching("alice").await.unwrap(), 2);

        let stats = cache.statistics().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.entries[0].key, "user_bob");
        assert_eq!(cache.delete_matching("").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_statistics_report_sizes() {
        let (cache, _dir) = store().await;

        cache.set("user_alice", &"xyz").await.unwrap();

        let stats = cache.statistics().await.unwrap();
        // "\"xyz\""
        assert_eq!(stats.entries[0].size_bytes, 5);
    }

    #[tokio::test]
    async fn test_statistics_tolerate_out_of_range_timestamp() {
        let (cache, _dir) = store().await;

        sqlx::query("INSERT INTO cache_entries (key, payload, stored_at) VALUES (?, ?, ?)")
            .bind("user_alice")
            .bind("1")
            .bind(i64::MAX)
            .execute(&cache.pool)
            .await
            .unwrap();

        let stats = cache.statistics().await.unwrap();
        assert_eq!(stats.entries[0].stored_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(stats.entries[0].age_millis, 0);
    }
}
