// tests/scheduler_loop.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{raw, RecordingSink, StaticSource};
use opportuna::ingest::types::ListingSource;
use opportuna::notify::Sink;
use opportuna::scheduler::{run_scheduler, shutdown_on};
use opportuna::seen::{MemorySeenStore, SeenStore};
use opportuna::{Dispatcher, PollContext};

#[tokio::test(start_paused = true)]
async fn polls_on_interval_until_shutdown() {
    let store: Arc<dyn SeenStore> = Arc::new(MemorySeenStore::new());
    let sink = RecordingSink::new("email");
    let sinks: Vec<Arc<dyn Sink>> = vec![sink.clone()];
    let sources: Vec<Box<dyn ListingSource>> = vec![Box::new(StaticSource::new(
        "s",
        vec![raw("Acme", "SWE Intern", "Summer 2026")],
    ))];
    let ctx = Arc::new(PollContext::new(sources, store, Dispatcher::new(sinks)));

    let interval = Duration::from_secs(30 * 60);
    run_scheduler(
        ctx.clone(),
        interval,
        tokio::time::sleep(Duration::from_secs(65 * 60)),
    )
    .await;

    // Ticks at 0, 30 and 60 minutes.
    let status = ctx.status.snapshot();
    assert_eq!(status.cycles, 3);
    // Only the first cycle reached the sink.
    assert_eq!(sink.attempts(), vec!["Acme"]);
}

#[tokio::test(start_paused = true)]
async fn broken_signal_listener_keeps_polling() {
    let store: Arc<dyn SeenStore> = Arc::new(MemorySeenStore::new());
    let sink = RecordingSink::new("email");
    let sinks: Vec<Arc<dyn Sink>> = vec![sink.clone()];
    let sources: Vec<Box<dyn ListingSource>> = vec![Box::new(StaticSource::new("s", vec![]))];
    let ctx = Arc::new(PollContext::new(sources, store, Dispatcher::new(sinks)));

    let shutdown = shutdown_on(async { Err(std::io::Error::other("no signal support")) });
    let outcome = tokio::time::timeout(
        Duration::from_secs(65 * 60),
        run_scheduler(ctx.clone(), Duration::from_secs(30 * 60), shutdown),
    )
    .await;

    assert!(outcome.is_err(), "scheduler stopped on a failed listener");
    assert_eq!(ctx.status.snapshot().cycles, 3);
}
