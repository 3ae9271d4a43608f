// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod listing;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod seen;

// ---- Re-exports for stable public API ----
pub use crate::dispatch::{plan_cycle, CyclePlan, DispatchReport, Dispatcher};
pub use crate::error::{CycleError, FetchError, SinkError, StoreError};
pub use crate::listing::{KeyPolicy, Listing, RawListing};
pub use crate::notify::Sink;
pub use crate::scheduler::{CycleReport, PollContext};
pub use crate::seen::{MemorySeenStore, SeenSnapshot, SeenStore, SqliteSeenStore};
