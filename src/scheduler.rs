// src/scheduler.rs
//! Poll cycle and the fixed-interval loop that drives it.
//!
//! All long-lived state lives in [`PollContext`], built once at startup and
//! borrowed by every cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::dispatch::{plan_cycle, Dispatcher};
use crate::error::CycleError;
use crate::ingest::{self, types::ListingSource};
use crate::listing::KeyPolicy;
use crate::seen::{SeenSnapshot, SeenStore};

/// Counts for one finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub fetch_errors: usize,
    pub invalid: usize,
    pub closed: usize,
    pub batch_duplicates: usize,
    pub already_seen: usize,
    pub new: usize,
    pub delivered: usize,
    pub pending: usize,
    pub sink_failures: BTreeMap<String, usize>,
}

/// What the admin API shows about the loop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollStatus {
    pub cycles: u64,
    pub last_report: Option<CycleReport>,
    pub last_error: Option<String>,
    pub last_finished_at: Option<DateTime<Utc>>,
}

/// Shared, cheaply cloneable view of [`PollStatus`].
#[derive(Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<PollStatus>>,
}

impl StatusHandle {
    pub fn snapshot(&self) -> PollStatus {
        self.inner.read().clone()
    }

    fn record(&self, outcome: &Result<CycleReport, CycleError>) {
        let mut s = self.inner.write();
        s.cycles += 1;
        s.last_finished_at = Some(Utc::now());
        match outcome {
            Ok(r) => {
                s.last_report = Some(r.clone());
                s.last_error = None;
            }
            Err(e) => s.last_error = Some(e.to_string()),
        }
    }
}

pub struct PollContext {
    pub sources: Vec<Box<dyn ListingSource>>,
    pub store: Arc<dyn SeenStore>,
    pub dispatcher: Dispatcher,
    pub key_policy: KeyPolicy,
    pub skip_inactive: bool,
    pub status: StatusHandle,
}

impl PollContext {
    pub fn new(
        sources: Vec<Box<dyn ListingSource>>,
        store: Arc<dyn SeenStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            sources,
            store,
            dispatcher,
            key_policy: KeyPolicy::default(),
            skip_inactive: false,
            status: StatusHandle::default(),
        }
    }

    pub fn with_key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    pub fn with_skip_inactive(mut self, skip: bool) -> Self {
        self.skip_inactive = skip;
        self
    }

    /// One complete fetch → normalize → dispatch run.
    ///
    /// Fetch errors are absorbed per source. A seen-store error aborts the
    /// cycle; listings not yet marked are simply planned again next time.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let outcome = self.cycle_inner().await;
        if let Err(CycleError::Store(e)) = &outcome {
            counter!("store_errors_total").increment(1);
            tracing::error!(error = %e, "seen store failed; cycle aborted");
        }
        self.status.record(&outcome);
        outcome
    }

    async fn cycle_inner(&self) -> Result<CycleReport, CycleError> {
        counter!("poll_cycles_total").increment(1);
        let mut report = CycleReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let (batches, fetch_errors) = ingest::fetch_all(&self.sources).await;
        report.fetch_errors = fetch_errors.len();
        report.fetched = batches.iter().map(|b| b.records.len() + b.unreadable).sum();

        let normalized = ingest::normalize_batch(batches, &self.key_policy, self.skip_inactive);
        report.invalid = normalized.invalid;
        report.closed = normalized.closed;
        report.batch_duplicates = normalized.duplicates;

        let snapshot = SeenSnapshot::probe(
            self.store.as_ref(),
            normalized.listings.iter().map(|l| l.canonical_key.as_str()),
        )
        .await?;
        tracing::debug!(seen = snapshot.len(), batch = normalized.listings.len(), "seen store probed");

        let plan = plan_cycle(normalized.listings, &snapshot);
        report.already_seen = plan.already_seen;
        report.new = plan.unseen.len();
        counter!("listings_new_total").increment(plan.unseen.len() as u64);

        let dispatched = self.dispatcher.dispatch(&plan, self.store.as_ref()).await?;
        report.delivered = dispatched.delivered;
        report.pending = dispatched.pending;
        report.sink_failures = dispatched.sink_failures;

        gauge!("poll_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            fetched = report.fetched,
            fetch_errors = report.fetch_errors,
            invalid = report.invalid,
            already_seen = report.already_seen,
            new = report.new,
            delivered = report.delivered,
            pending = report.pending,
            "poll cycle finished"
        );
        Ok(report)
    }
}

/// Shutdown future driven by a signal listener such as
/// `tokio::signal::ctrl_c()`. If the listener cannot be installed the error
/// is logged and the future never resolves, so polling carries on.
pub async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "cannot listen for shutdown signal; running until killed");
        std::future::pending::<()>().await;
    }
}

/// Run cycles every `interval` until `shutdown` resolves. The first cycle
/// starts immediately; a cycle always finishes before the next one starts.
pub async fn run_scheduler<F>(ctx: Arc<PollContext>, interval: Duration, shutdown: F)
where
    F: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("scheduler stopping");
                break;
            }
            _ = ticker.tick() => {
                // Errors are logged inside run_cycle; the loop keeps going.
                let _ = ctx.run_cycle().await;
                tracing::info!(next_in_secs = interval.as_secs(), "sleeping until next poll");
            }
        }
    }
}
