// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use std::collections::HashSet;

use metrics::counter;

use crate::error::FetchError;
use crate::ingest::types::{ListingSource, SourceBatch};
use crate::listing::{KeyPolicy, Listing};

/// Normalize display text: decode entities, straighten quotes, collapse
/// whitespace, trim. Feed text is plain, so angle brackets are kept as-is
/// and nothing is truncated.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Outcome of normalizing one poll's raw records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub listings: Vec<Listing>,
    /// Missing company/title, or unreadable entries reported by the source.
    pub invalid: usize,
    /// Flagged inactive or hidden while `skip_inactive` is on.
    pub closed: usize,
    /// Same canonical key seen earlier in this batch.
    pub duplicates: usize,
}

/// Normalize every record, drop invalid/closed ones and collapse repeats
/// of the same canonical key within the batch (first occurrence wins).
pub fn normalize_batch(
    batches: Vec<SourceBatch>,
    policy: &KeyPolicy,
    skip_inactive: bool,
) -> NormalizedBatch {
    let mut out = NormalizedBatch::default();
    let mut keys: HashSet<String> = HashSet::new();

    for batch in batches {
        out.invalid += batch.unreadable;
        for raw in batch.records {
            if skip_inactive && !raw.is_open() {
                out.closed += 1;
                continue;
            }
            let Some(listing) = Listing::from_raw(&batch.source_id, raw, policy) else {
                tracing::debug!(source = %batch.source_id, "skipping listing without company/title");
                out.invalid += 1;
                continue;
            };
            if !keys.insert(listing.canonical_key.clone()) {
                out.duplicates += 1;
                continue;
            }
            out.listings.push(listing);
        }
    }

    out
}

/// Poll every source in order. A failing source is logged and reported;
/// the remaining sources are still polled.
pub async fn fetch_all(
    sources: &[Box<dyn ListingSource>],
) -> (Vec<SourceBatch>, Vec<FetchError>) {
    crate::metrics::ensure_described();

    let mut batches = Vec::with_capacity(sources.len());
    let mut errors = Vec::new();
    for s in sources {
        match s.fetch_latest().await {
            Ok(b) => {
                tracing::debug!(source = s.id(), records = b.records.len(), "fetched");
                batches.push(b);
            }
            Err(e) => {
                tracing::warn!(error = %e, source = e.source_id(), "source fetch failed");
                counter!("fetch_errors_total", "source" => e.source_id().to_string()).increment(1);
                errors.push(e);
            }
        }
    }
    (batches, errors)
}
