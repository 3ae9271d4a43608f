// tests/cycle_failures.rs
//
// Fetch errors are absorbed per source; seen-store errors abort the cycle.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{raw, DownSource, FlakyStore, RecordingSink, StaticSource};
use opportuna::ingest::types::ListingSource;
use opportuna::notify::Sink;
use opportuna::seen::SeenStore;
use opportuna::{CycleError, Dispatcher, PollContext};

fn ctx_with(
    sources: Vec<Box<dyn ListingSource>>,
    store: Arc<dyn SeenStore>,
    sink: Arc<RecordingSink>,
) -> PollContext {
    let sinks: Vec<Arc<dyn Sink>> = vec![sink];
    PollContext::new(sources, store, Dispatcher::new(sinks))
}

#[tokio::test]
async fn down_source_does_not_block_the_others() {
    let good = StaticSource::new("good", vec![raw("Acme", "SWE Intern", "Summer 2026")]);
    let store = Arc::new(FlakyStore::default());
    let sink = RecordingSink::new("email");
    let sources: Vec<Box<dyn ListingSource>> = vec![Box::new(DownSource), Box::new(good)];
    let ctx = ctx_with(sources, store.clone(), sink.clone());

    let r = ctx.run_cycle().await.unwrap();
    assert_eq!(r.fetch_errors, 1);
    assert_eq!(r.delivered, 1);
    assert_eq!(sink.delivered(), vec!["Acme"]);
}

#[tokio::test]
async fn store_read_failure_aborts_before_any_sink() {
    let src = StaticSource::new("s", vec![raw("Acme", "SWE Intern", "Summer 2026")]);
    let store = Arc::new(FlakyStore::default());
    store.fail_exists.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new("email");
    let sources: Vec<Box<dyn ListingSource>> = vec![Box::new(src)];
    let ctx = ctx_with(sources, store.clone(), sink.clone());

    let err = ctx.run_cycle().await.unwrap_err();
    assert!(matches!(err, CycleError::Store(_)));
    assert!(sink.attempts().is_empty());

    let status = ctx.status.snapshot();
    assert_eq!(status.cycles, 1);
    assert!(status.last_error.unwrap().contains("exists: simulated"));

    // Store back: the listing is dispatched on the next cycle.
    store.fail_exists.store(false, Ordering::SeqCst);
    let r = ctx.run_cycle().await.unwrap();
    assert_eq!(r.delivered, 1);
    assert!(ctx.status.snapshot().last_error.is_none());
}

#[tokio::test]
async fn store_write_failure_stops_dispatch_and_marks_nothing() {
    let src = StaticSource::new(
        "s",
        vec![
            raw("Acme", "SWE Intern", "Summer 2026"),
            raw("Beta", "SWE Intern", "Summer 2026"),
        ],
    );
    let store = Arc::new(FlakyStore::default());
    store.fail_mark.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new("email");
    let sources: Vec<Box<dyn ListingSource>> = vec![Box::new(src)];
    let ctx = ctx_with(sources, store.clone(), sink.clone());

    assert!(ctx.run_cycle().await.is_err());
    // The first listing was delivered but could not be marked; the cycle
    // stopped there.
    assert_eq!(sink.attempts(), vec!["Acme"]);
    assert_eq!(store.count().await.unwrap(), 0);

    store.fail_mark.store(false, Ordering::SeqCst);
    let r = ctx.run_cycle().await.unwrap();
    assert_eq!((r.new, r.delivered), (2, 2));
    assert_eq!(store.count().await.unwrap(), 2);
}
