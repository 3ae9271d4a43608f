use reqwest::Client;
use serde_json::{json, Value};

use super::Sink;
use crate::error::SinkError;
use crate::listing::Listing;

pub const DEFAULT_API_BASE: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub api_base: String,
}

/// Tracking-database sink: one Notion page per listing.
#[derive(Clone)]
pub struct NotionSink {
    cfg: NotionConfig,
    client: Client,
}

impl NotionSink {
    pub fn new(cfg: NotionConfig, client: Client) -> Self {
        Self { cfg, client }
    }

    fn pages_url(&self) -> String {
        format!("{}/v1/pages", self.cfg.api_base.trim_end_matches('/'))
    }

    /// Page-creation body for `POST /v1/pages`.
    pub fn page_payload(&self, l: &Listing) -> Value {
        let date = match l.date_posted {
            Some(d) => json!({ "start": d.to_rfc3339() }),
            None => Value::Null,
        };
        json!({
            "parent": { "database_id": self.cfg.database_id },
            "properties": {
                "Company": { "title": rich(&l.company) },
                "Title": { "rich_text": rich(&l.title) },
                "Term": { "rich_text": rich(&l.term) },
                "Location(s)": { "rich_text": rich(&l.locations_display()) },
                "Date Posted": { "date": date },
                "Sponsorship": { "rich_text": rich(&l.sponsorship) },
            }
        })
    }
}

fn rich(text: &str) -> Value {
    json!([{ "text": { "content": text } }])
}

#[async_trait::async_trait]
impl Sink for NotionSink {
    fn name(&self) -> &'static str {
        "notion"
    }

    async fn deliver(&self, listing: &Listing) -> Result<(), SinkError> {
        let rsp = self
            .client
            .post(self.pages_url())
            .bearer_auth(&self.cfg.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&self.page_payload(listing))
            .send()
            .await
            .map_err(|e| SinkError::new(self.name(), format!("request failed: {e}")))?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(SinkError::new(
                self.name(),
                format!("HTTP {}: {body}", status.as_u16()),
            ));
        }

        tracing::info!(listing = %listing.label(), "added to notion");
        Ok(())
    }
}
