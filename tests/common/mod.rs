// tests/common/mod.rs
//
// Test doubles shared by the integration tests: a source whose records can
// be swapped between polls, a sink that records calls and can be told to
// fail, and a seen store that fails on demand.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use opportuna::error::{FetchError, SinkError, StoreError};
use opportuna::ingest::types::{ListingSource, SourceBatch};
use opportuna::listing::{Listing, OneOrMany, RawListing};
use opportuna::notify::Sink;
use opportuna::seen::{MemorySeenStore, SeenRecord, SeenStore};

pub fn raw(company: &str, title: &str, term: &str) -> RawListing {
    RawListing {
        company_name: Some(company.into()),
        title: Some(title.into()),
        terms: Some(OneOrMany::Many(vec![term.into()])),
        locations: Some(OneOrMany::Many(vec!["Remote".into()])),
        url: Some(format!("https://jobs.test/{}", company.to_lowercase())),
        ..Default::default()
    }
}

/// Serves whatever records were last set. Clones share the records.
#[derive(Clone)]
pub struct StaticSource {
    id: String,
    records: Arc<Mutex<Vec<RawListing>>>,
}

impl StaticSource {
    pub fn new(id: &str, records: Vec<RawListing>) -> Self {
        Self {
            id: id.into(),
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn set(&self, records: Vec<RawListing>) {
        *self.records.lock() = records;
    }
}

#[async_trait]
impl ListingSource for StaticSource {
    async fn fetch_latest(&self) -> Result<SourceBatch, FetchError> {
        Ok(SourceBatch {
            source_id: self.id.clone(),
            records: self.records.lock().clone(),
            unreadable: 0,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Always unreachable.
pub struct DownSource;

#[async_trait]
impl ListingSource for DownSource {
    async fn fetch_latest(&self) -> Result<SourceBatch, FetchError> {
        Err(FetchError::Status {
            source_id: "down".into(),
            status: 502,
        })
    }

    fn id(&self) -> &str {
        "down"
    }
}

/// Records every delivery attempt; fails while `failing` is set.
pub struct RecordingSink {
    name: &'static str,
    failing: AtomicBool,
    pub attempts: Mutex<Vec<String>>,
    pub delivered: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            failing: AtomicBool::new(false),
            attempts: Mutex::new(vec![]),
            delivered: Mutex::new(vec![]),
        })
    }

    pub fn set_failing(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }

    pub fn clear(&self) {
        self.attempts.lock().clear();
        self.delivered.lock().clear();
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, listing: &Listing) -> Result<(), SinkError> {
        self.attempts.lock().push(listing.company.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::new(self.name, "simulated outage"));
        }
        self.delivered.lock().push(listing.company.clone());
        Ok(())
    }
}

/// Wraps a memory store; `exists` and/or `mark` can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemorySeenStore,
    pub fail_exists: AtomicBool,
    pub fail_mark: AtomicBool,
}

#[async_trait]
impl SeenStore for FlakyStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("exists: simulated".into()));
        }
        self.inner.exists(key).await
    }

    async fn mark(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mark: simulated".into()));
        }
        self.inner.mark(key, at).await
    }

    async fn record(&self, key: &str) -> Result<Option<SeenRecord>, StoreError> {
        self.inner.record(key).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }
}
