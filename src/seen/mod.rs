//! Persisted set of canonical keys that have already been reported.
//!
//! The store is append-only: `mark` inserts a key once and later marks of the
//! same key are no-ops that keep the original `first_seen_at`. There is no
//! removal and no update, so a key that made it in is never notified again.

pub mod memory;
pub mod sqlite;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;

pub use memory::MemorySeenStore;
pub use sqlite::SqliteSeenStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeenRecord {
    pub canonical_key: String,
    pub first_seen_at: DateTime<Utc>,
}

#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Record `key` as reported. Marking a present key succeeds without change.
    async fn mark(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn record(&self, key: &str) -> Result<Option<SeenRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Which of a batch's keys were already seen when the cycle started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSnapshot {
    seen: HashSet<String>,
}

impl SeenSnapshot {
    /// Ask the store about each key once. Any store error aborts the probe.
    pub async fn probe<'a, I>(store: &dyn SeenStore, keys: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        for key in keys {
            if store.exists(key).await? {
                seen.insert(key.to_string());
            }
        }
        Ok(Self { seen })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSnapshot {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            seen: iter.into_iter().map(Into::into).collect(),
        }
    }
}
