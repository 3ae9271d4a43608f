//! # Listings
//! Raw feed records, their normalized form, and canonical key derivation.
//!
//! The canonical key is what the seen store remembers. It is built only from
//! stable fields selected by a [`KeyPolicy`], each folded through
//! [`key_part`], so cosmetic edits (extra whitespace, casing, HTML entities,
//! reordered terms, an updated location list) keep the same identity.
//! The fold never drops characters, so distinct postings keep distinct keys.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::ingest::normalize_text;

/// Placeholder used by every display field that the feed left empty.
pub const NOT_AVAILABLE: &str = "N/A";

const KEY_SEPARATOR: char = '\u{1f}';

/// Either a single string or a list of strings; feeds disagree on which.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// One record of a `listings.json` feed, as published.
///
/// SimplifyJobs feeds carry `terms: ["Summer 2025"]`, vanshb03 feeds carry
/// `season: "Fall"`. Every field is optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawListing {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub locations: Option<OneOrMany>,
    #[serde(default)]
    pub terms: Option<OneOrMany>,
    #[serde(default)]
    pub season: Option<String>,
    /// Unix seconds. Floats and numeric strings are accepted; anything else
    /// reads as missing rather than rejecting the record.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_posted: Option<i64>,
    #[serde(default)]
    pub sponsorship: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub is_visible: Option<bool>,
}

fn lenient_timestamp<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(whole_seconds)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().and_then(whole_seconds),
        _ => None,
    };
    Ok(secs)
}

fn whole_seconds(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
}

impl RawListing {
    /// False when the feed explicitly flags the posting as closed or hidden.
    pub fn is_open(&self) -> bool {
        self.active != Some(false) && self.is_visible != Some(false)
    }
}

/// Which optional fields join company and title in the canonical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyPolicy {
    pub source: bool,
    pub term: bool,
    pub location: bool,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            source: true,
            term: true,
            location: false,
        }
    }
}

impl FromStr for KeyPolicy {
    type Err = String;

    /// Parses a comma separated field list such as `source,term`.
    /// `company` and `title` are always part of the key and may be listed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut policy = KeyPolicy {
            source: false,
            term: false,
            location: false,
        };
        for field in s.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match field.to_ascii_lowercase().as_str() {
                "company" | "title" => {}
                "source" => policy.source = true,
                "term" => policy.term = true,
                "location" | "locations" => policy.location = true,
                other => return Err(format!("unknown canonical field '{other}'")),
            }
        }
        Ok(policy)
    }
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![];
        if self.source {
            fields.push("source");
        }
        fields.extend(["company", "title"]);
        if self.term {
            fields.push("term");
        }
        if self.location {
            fields.push("location");
        }
        f.write_str(&fields.join(","))
    }
}

/// A posting after normalization; recomputed on every poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub source_id: String,
    pub canonical_key: String,
    pub company: String,
    pub title: String,
    pub term: String,
    pub locations: Vec<String>,
    pub date_posted: Option<DateTime<Utc>>,
    pub sponsorship: String,
    pub application_url: Option<String>,
}

impl Listing {
    /// Normalize a raw record. Returns `None` when company or title is missing.
    pub fn from_raw(source_id: &str, raw: RawListing, policy: &KeyPolicy) -> Option<Self> {
        let company = non_empty(raw.company_name.as_deref().map(normalize_text))?;
        let title = non_empty(raw.title.as_deref().map(normalize_text))?;

        let terms: Vec<String> = clean_list(raw.terms.map(OneOrMany::into_vec));
        let term = if !terms.is_empty() {
            terms.join(", ")
        } else {
            non_empty(raw.season.as_deref().map(normalize_text))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };

        // feed order is kept for display; the key sees the terms as a set
        let key_term = if terms.is_empty() {
            term.clone()
        } else {
            let mut set = terms.clone();
            set.sort_by_cached_key(|t| key_part(t));
            set.dedup_by(|a, b| key_part(a) == key_part(b));
            set.join(", ")
        };

        let locations = clean_list(raw.locations.map(OneOrMany::into_vec));

        let canonical_key = canonical_key(
            policy,
            source_id,
            &company,
            &title,
            &key_term,
            locations.first().map(String::as_str),
        );

        Some(Self {
            source_id: source_id.to_string(),
            canonical_key,
            company,
            title,
            term,
            locations,
            date_posted: raw
                .date_posted
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            sponsorship: non_empty(raw.sponsorship.as_deref().map(normalize_text))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            application_url: non_empty(raw.url.map(|u| u.trim().to_string())),
        })
    }

    /// `"Company - Title"`, used in logs and subjects.
    pub fn label(&self) -> String {
        format!("{} - {}", self.company, self.title)
    }

    pub fn locations_display(&self) -> String {
        if self.locations.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.locations.join("; ")
        }
    }

    pub fn date_posted_display(&self) -> String {
        self.date_posted
            .map(|d| d.format("%b %d, %Y").to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn application_url_display(&self) -> &str {
        self.application_url.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

/// Fold one stable field into its key form: entities decoded, whitespace
/// collapsed, lowercased. Nothing else is removed and there is no length cap.
pub fn key_part(s: &str) -> String {
    html_escape::decode_html_entities(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase hex SHA-256 over the policy-selected, folded fields.
pub fn canonical_key(
    policy: &KeyPolicy,
    source_id: &str,
    company: &str,
    title: &str,
    term: &str,
    first_location: Option<&str>,
) -> String {
    let mut parts = Vec::with_capacity(5);
    if policy.source {
        parts.push(key_part(source_id));
    }
    parts.push(key_part(company));
    parts.push(key_part(title));
    if policy.term {
        parts.push(key_part(term));
    }
    if policy.location {
        parts.push(key_part(first_location.unwrap_or(NOT_AVAILABLE)));
    }

    let joined = parts.join(&KEY_SEPARATOR.to_string());
    let digest = Sha256::digest(joined.as_bytes());
    format!("{digest:x}")
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn clean_list(items: Option<Vec<String>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .iter()
        .map(|s| normalize_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}
