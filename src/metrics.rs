use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_cycles_total", "Poll cycles started.");
        describe_counter!(
            "listings_fetched_total",
            "Listing records read from sources."
        );
        describe_counter!(
            "listings_new_total",
            "Listings not yet in the seen store when a cycle planned them."
        );
        describe_counter!(
            "listings_marked_total",
            "Listings delivered to every sink and marked seen."
        );
        describe_counter!("fetch_errors_total", "Source fetch/parse errors.");
        describe_counter!("sink_failures_total", "Failed sink deliveries.");
        describe_counter!("store_errors_total", "Cycles aborted by seen store errors.");
        describe_histogram!("fetch_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("poll_last_run_ts", "Unix ts when the last poll cycle finished.");
    });
}
