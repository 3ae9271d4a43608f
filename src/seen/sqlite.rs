//! SQLite-backed seen store.
//!
//! One table, one row per reported key:
//!
//! ```text
//! seen_listings(canonical_key TEXT PRIMARY KEY, first_seen_at TEXT NOT NULL)
//! ```
//!
//! `mark` is a single `INSERT .. ON CONFLICT DO NOTHING`, an atomic upsert,
//! so several writers on the same file cannot produce a duplicate row or
//! move `first_seen_at`.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::{SeenRecord, SeenStore};
use crate::error::StoreError;

pub struct SqliteSeenStore {
    pool: SqlitePool,
}

impl SqliteSeenStore {
    /// Open (creating if missing) the store file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.as_ref().display())))?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!(path = %path.as_ref().display(), "seen store opened");
        Ok(store)
    }

    /// Ephemeral store on a single pinned connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_listings (
                canonical_key TEXT PRIMARY KEY,
                first_seen_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Flush and close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SeenStore for SqliteSeenStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM seen_listings WHERE canonical_key = ?1)",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }

    async fn mark(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seen_listings (canonical_key, first_seen_at) VALUES (?1, ?2) \
             ON CONFLICT(canonical_key) DO NOTHING",
        )
        .bind(key)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record(&self, key: &str) -> Result<Option<SeenRecord>, StoreError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT canonical_key, first_seen_at FROM seen_listings WHERE canonical_key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(canonical_key, ts)| {
            let first_seen_at = DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| StoreError::Corrupt(format!("{canonical_key}: {e}")))?
                .with_timezone(&Utc);
            Ok(SeenRecord {
                canonical_key,
                first_seen_at,
            })
        })
        .transpose()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_listings")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }
}
