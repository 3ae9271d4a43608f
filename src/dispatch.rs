//! # Dispatcher
//! Decides which listings are new and delivers them.
//!
//! Planning is pure: [`plan_cycle`] maps a normalized batch plus a
//! [`SeenSnapshot`] to the listings that need notifying. Delivery is the
//! only side-effecting step: every sink is tried for every planned listing,
//! and the key is marked in the seen store only when all sinks accepted it.
//! A listing with any failed sink stays unseen and is planned again next
//! cycle (at-least-once).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;

use crate::error::StoreError;
use crate::listing::Listing;
use crate::notify::Sink;
use crate::seen::{SeenSnapshot, SeenStore};

/// Listings of one cycle that still need notifying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CyclePlan {
    pub unseen: Vec<Listing>,
    pub already_seen: usize,
}

/// Split a batch into unseen listings and a count of those already reported.
pub fn plan_cycle(listings: Vec<Listing>, seen: &SeenSnapshot) -> CyclePlan {
    if seen.is_empty() {
        return CyclePlan {
            unseen: listings,
            already_seen: 0,
        };
    }
    let mut plan = CyclePlan::default();
    for l in listings {
        if seen.contains(&l.canonical_key) {
            plan.already_seen += 1;
        } else {
            plan.unseen.push(l);
        }
    }
    plan
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Accepted by every sink and marked seen.
    pub delivered: usize,
    /// At least one sink failed; left unseen for the next cycle.
    pub pending: usize,
    /// Failed deliveries per sink name.
    pub sink_failures: BTreeMap<String, usize>,
}

pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    pacing: Duration,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            sinks,
            pacing: Duration::ZERO,
        }
    }

    /// Pause between consecutive sink calls (simple rate limiting).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver every planned listing and mark the fully delivered ones.
    ///
    /// A `StoreError` from `mark` stops dispatch immediately: the listing
    /// that could not be marked and everything after it stay unseen.
    pub async fn dispatch(
        &self,
        plan: &CyclePlan,
        store: &dyn SeenStore,
    ) -> Result<DispatchReport, StoreError> {
        let mut report = DispatchReport::default();
        let mut first_call = true;

        for listing in &plan.unseen {
            let mut failed = 0usize;
            for sink in &self.sinks {
                if !first_call && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                first_call = false;

                if let Err(e) = sink.deliver(listing).await {
                    tracing::warn!(
                        error = %e,
                        listing = %listing.label(),
                        key = %listing.canonical_key,
                        "sink delivery failed; listing stays unseen"
                    );
                    counter!("sink_failures_total", "sink" => sink.name()).increment(1);
                    *report
                        .sink_failures
                        .entry(sink.name().to_string())
                        .or_default() += 1;
                    failed += 1;
                }
            }

            if failed > 0 {
                report.pending += 1;
                continue;
            }

            store.mark(&listing.canonical_key, Utc::now()).await?;
            counter!("listings_marked_total").increment(1);
            tracing::info!(listing = %listing.label(), key = %listing.canonical_key, "marked seen");
            report.delivered += 1;
        }

        Ok(report)
    }
}
