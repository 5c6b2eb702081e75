//! SQLite-backed settings and lookup cache

use crate::Result;
use anyhow::Context;
use chrono::Utc;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Settings key holding the IP-quality API key
pub const API_KEY_SETTING: &str = "ipquality_api_key";

#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if needed) the database at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {:?}", path))?;

        let storage = Self { pool };
        storage.migrate().await?;
        debug!("Opened storage at {:?}", path);
        Ok(storage)
    }

    /// A private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.map(|(v,)| v))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The stored IP-quality API key, empty when none is set
    pub async fn api_key(&self) -> Result<String> {
        Ok(self.get_setting(API_KEY_SETTING).await?.unwrap_or_default())
    }

    /// Cached value for `key`; expired entries are removed and read as absent
    pub async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, expires_at FROM cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if Utc::now().timestamp_millis() >= expires_at {
            sqlx::query("DELETE FROM cache WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let decoded = serde_json::from_str(&value)
            .with_context(|| format!("Failed to decode cache entry {}", key))?;
        Ok(Some(decoded))
    }

    pub async fn cache_set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: chrono::Duration,
    ) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        // lifetimes past the calendar's range never expire
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .map_or(i64::MAX, |at| at.timestamp_millis());

        sqlx::query("INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(encoded)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let storage = Storage::in_memory().await.unwrap();
        assert_eq!(storage.get_setting("missing").await.unwrap(), None);

        storage.set_setting("theme", "dark").await.unwrap();
        storage.set_setting("theme", "light").await.unwrap();
        assert_eq!(
            storage.get_setting("theme").await.unwrap().as_deref(),
            Some("light")
        );

        storage.delete_setting("theme").await.unwrap();
        assert_eq!(storage.get_setting("theme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_api_key_defaults_to_empty() {
        let storage = Storage::in_memory().await.unwrap();
        assert_eq!(storage.api_key().await.unwrap(), "");

        storage.set_setting(API_KEY_SETTING, "secret").await.unwrap();
        assert_eq!(storage.api_key().await.unwrap(), "secret");
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let storage = Storage::in_memory().await.unwrap();
        storage
            .cache_set("fresh", &vec![1, 2, 3], chrono::Duration::hours(1))
            .await
            .unwrap();
        storage
            .cache_set("stale", &"old", chrono::Duration::seconds(-1))
            .await
            .unwrap();

        let fresh: Option<Vec<i32>> = storage.cache_get("fresh").await.unwrap();
        assert_eq!(fresh, Some(vec![1, 2, 3]));

        let stale: Option<String> = storage.cache_get("stale").await.unwrap();
        assert_eq!(stale, None);
    }

    #[tokio::test]
    async fn test_cache_lifetime_beyond_calendar() {
        let storage = Storage::in_memory().await.unwrap();
        let longest = chrono::Duration::try_hours(i64::MAX / 3_600_000).unwrap();
        storage.cache_set("kept", &"row", longest).await.unwrap();

        let kept: Option<String> = storage.cache_get("kept").await.unwrap();
        assert_eq!(kept.as_deref(), Some("row"));
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        let storage = Storage::open(&path).await.unwrap();
        storage.set_setting(API_KEY_SETTING, "k").await.unwrap();
        storage.close().await;
        assert!(path.exists());

        let reopened = Storage::open(&path).await.unwrap();
        assert_eq!(reopened.api_key().await.unwrap(), "k");
    }
}
