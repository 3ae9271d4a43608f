// src/error.rs

//! Error kinds of a poll cycle.
//!
//! Each kind maps to one recovery rule:
//! - `FetchError`: the source is skipped for this cycle, other sources continue.
//! - `SinkError`: the listing stays unseen and is offered again next cycle.
//! - `StoreError`: the cycle aborts; nothing can be marked safely.

use thiserror::Error;

/// A source could not be read or did not return a listings array.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to source '{source_id}' failed: {message}")]
    Request { source_id: String, message: String },

    #[error("source '{source_id}' answered HTTP {status}")]
    Status { source_id: String, status: u16 },

    #[error("malformed listings from source '{source_id}': {message}")]
    Malformed { source_id: String, message: String },
}

impl FetchError {
    pub fn request(source_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Request {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(source_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Malformed {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::Request { source_id, .. }
            | Self::Status { source_id, .. }
            | Self::Malformed { source_id, .. } => source_id,
        }
    }
}

/// Delivery of one listing to one sink failed.
#[derive(Error, Debug)]
#[error("{sink} delivery failed: {message}")]
pub struct SinkError {
    pub sink: &'static str,
    pub message: String,
}

impl SinkError {
    pub fn new(sink: &'static str, message: impl std::fmt::Display) -> Self {
        Self {
            sink,
            message: message.to_string(),
        }
    }
}

/// The seen store could not be opened, read or written.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("seen store unavailable: {0}")]
    Unavailable(String),

    #[error("seen store query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("seen store holds an unreadable record: {0}")]
    Corrupt(String),
}

/// Reason a whole poll cycle was abandoned.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("poll cycle aborted: {0}")]
    Store(#[from] StoreError),
}
