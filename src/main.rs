//! Opportuna binary entrypoint.
//! Loads configuration, opens the seen store, wires sources and sinks into a
//! `PollContext`, optionally serves the admin API, then polls until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opportuna::api::{self, AppState};
use opportuna::config::{AppConfig, LogFormat};
use opportuna::ingest::providers::github_json::GithubJsonProvider;
use opportuna::ingest::types::ListingSource;
use opportuna::metrics::Metrics;
use opportuna::notify::{EmailSink, NotionSink, Sink};
use opportuna::scheduler::{run_scheduler, shutdown_on, PollContext};
use opportuna::seen::{SeenStore, SqliteSeenStore};
use opportuna::Dispatcher;

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opportuna=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::from_env().context("loading configuration")?;
    init_tracing(cfg.log_format);

    let metrics = Metrics::init()?;

    // The only fatal runtime dependency: without the store nothing can be marked.
    let store: Arc<dyn SeenStore> = Arc::new(
        SqliteSeenStore::open(&cfg.seen_db)
            .await
            .with_context(|| format!("opening seen store {}", cfg.seen_db.display()))?,
    );

    let client = cfg.http_client()?;

    let sources: Vec<Box<dyn ListingSource>> = cfg
        .sources
        .iter()
        .map(|s| {
            Box::new(GithubJsonProvider::from_url(&s.id, &s.url, client.clone()))
                as Box<dyn ListingSource>
        })
        .collect();

    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    if let Some(email) = &cfg.email {
        sinks.push(Arc::new(EmailSink::new(email, cfg.http_timeout)?));
    }
    if let Some(notion) = &cfg.notion {
        sinks.push(Arc::new(NotionSink::new(notion.clone(), client.clone())));
    }

    let dispatcher = Dispatcher::new(sinks).with_pacing(cfg.sink_pacing);
    tracing::info!(
        sources = cfg.sources.len(),
        sinks = ?dispatcher.sink_names(),
        interval_mins = cfg.poll_interval.as_secs() / 60,
        seen_db = %cfg.seen_db.display(),
        key_fields = %cfg.key_policy,
        "opportuna started"
    );

    let ctx = Arc::new(
        PollContext::new(sources, store.clone(), dispatcher)
            .with_key_policy(cfg.key_policy)
            .with_skip_inactive(cfg.skip_inactive),
    );

    if let Some(addr) = cfg.admin_addr {
        let app = api::router(AppState {
            status: ctx.status.clone(),
            store: store.clone(),
        })
        .merge(metrics.router());
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding admin API on {addr}"))?;
        tracing::info!(%addr, "admin API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "admin API stopped");
            }
        });
    }

    run_scheduler(ctx, cfg.poll_interval, shutdown_on(tokio::signal::ctrl_c())).await;

    tracing::info!("opportuna stopped");
    Ok(())
}
