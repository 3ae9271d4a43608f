// src/ingest/providers/github_json.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;

use crate::error::FetchError;
use crate::ingest::types::{ListingSource, SourceBatch};
use crate::listing::RawListing;

/// A `listings.json` feed as published by the SimplifyJobs / vanshb03
/// internship repositories: a top-level JSON array of listing objects.
pub struct GithubJsonProvider {
    id: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl GithubJsonProvider {
    pub fn from_url(id: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            id: id.into(),
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    /// Serve a fixed body on every fetch; used by tests and dry runs.
    pub fn from_fixture(id: impl Into<String>, body: &str) -> Self {
        Self {
            id: id.into(),
            mode: Mode::Fixture(body.to_string()),
        }
    }
}

/// Parse a feed body. The body must be a JSON array; entries that do not
/// deserialize as a listing are counted in `unreadable` and skipped.
pub fn parse_listings(source_id: &str, body: &str) -> Result<SourceBatch, FetchError> {
    let t0 = std::time::Instant::now();
    let values: Vec<Value> =
        serde_json::from_str(body).map_err(|e| FetchError::malformed(source_id, e))?;

    let mut records = Vec::with_capacity(values.len());
    let mut unreadable = 0usize;
    for v in values {
        match serde_json::from_value::<RawListing>(v) {
            Ok(r) => records.push(r),
            Err(e) => {
                tracing::debug!(source = source_id, error = %e, "unreadable listing entry");
                unreadable += 1;
            }
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("fetch_parse_ms").record(ms);
    counter!("listings_fetched_total", "source" => source_id.to_string())
        .increment(records.len() as u64);

    Ok(SourceBatch {
        source_id: source_id.to_string(),
        records,
        unreadable,
    })
}

#[async_trait]
impl ListingSource for GithubJsonProvider {
    async fn fetch_latest(&self) -> Result<SourceBatch, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => parse_listings(&self.id, s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .map_err(|e| FetchError::request(&self.id, e))?;

                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        source_id: self.id.clone(),
                        status: status.as_u16(),
                    });
                }

                let body = resp
                    .text()
                    .await
                    .map_err(|e| FetchError::request(&self.id, e))?;
                parse_listings(&self.id, &body)
            }
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_array_body_is_malformed() {
        let err = parse_listings("s", r#"{"listings": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn bad_entries_are_skipped_not_fatal() {
        let body = r#"[
            {"company_name": "Acme", "title": "Intern", "locations": ["NYC"]},
            42,
            {"company_name": "Beta", "title": ["Intern"]},
            {"company_name": "Gamma", "title": "Intern", "date_posted": 1757203200.5}
        ]"#;
        let batch = parse_listings("s", body).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.unreadable, 2);
        assert_eq!(batch.records[1].date_posted, Some(1_757_203_200));
    }

    #[tokio::test]
    async fn fixture_mode_serves_the_body() {
        let p = GithubJsonProvider::from_fixture("fx", r#"[{"company_name":"A","title":"B"}]"#);
        let batch = p.fetch_latest().await.unwrap();
        assert_eq!(batch.source_id, "fx");
        assert_eq!(batch.records.len(), 1);
    }
}
