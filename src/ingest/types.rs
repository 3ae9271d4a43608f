// src/ingest/types.rs
use crate::error::FetchError;
use crate::listing::RawListing;

/// Records pulled from one source in one poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    pub source_id: String,
    pub records: Vec<RawListing>,
    /// Array entries that were not objects of the expected shape.
    pub unreadable: usize,
}

#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<SourceBatch, FetchError>;
    fn id(&self) -> &str;
}
