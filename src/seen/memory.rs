use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{SeenRecord, SeenStore};
use crate::error::StoreError;

/// In-process seen store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().contains_key(key))
    }

    async fn mark(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.lock().entry(key.to_string()).or_insert(at);
        Ok(())
    }

    async fn record(&self, key: &str) -> Result<Option<SeenRecord>, StoreError> {
        Ok(self.inner.lock().get(key).map(|ts| SeenRecord {
            canonical_key: key.to_string(),
            first_seen_at: *ts,
        }))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().len() as u64)
    }
}
