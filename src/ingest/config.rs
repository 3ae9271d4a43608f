// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SOURCES_PATH: &str = "OPPORTUNA_SOURCES_PATH";

/// One polled feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub url: String,
}

/// Feeds polled when no source file is present.
pub fn builtin_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: "vanshb03-summer2026".into(),
            url: "https://raw.githubusercontent.com/vanshb03/Summer2026-Internships/refs/heads/dev/.github/scripts/listings.json".into(),
        },
        SourceConfig {
            id: "simplify-summer2025".into(),
            url: "https://raw.githubusercontent.com/SimplifyJobs/Summer2025-Internships/refs/heads/dev/.github/scripts/listings.json".into(),
        },
    ]
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using env var + fallbacks:
/// 1) $OPPORTUNA_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) the built-in feeds
pub fn load_sources_default() -> Result<Vec<SourceConfig>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(builtin_sources())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<SourceConfig>> {
    let parsed = if hint_ext == "toml" || s.contains("[[sources]]") {
        parse_toml(s)
    } else {
        parse_json(s).or_else(|_| parse_toml(s))
    }?;
    if parsed.is_empty() {
        bail!("source list is empty");
    }
    Ok(parsed)
}

fn parse_toml(s: &str) -> Result<Vec<SourceConfig>> {
    #[derive(Deserialize)]
    struct TomlSources {
        sources: Vec<SourceConfig>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<SourceConfig>> {
    let v: Vec<SourceConfig> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blank entries, keep the first entry per id.
fn clean_list(items: Vec<SourceConfig>) -> Vec<SourceConfig> {
    let mut ids = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let id = it.id.trim().to_string();
        let url = it.url.trim().to_string();
        if id.is_empty() || url.is_empty() || !ids.insert(id.clone()) {
            continue;
        }
        out.push(SourceConfig { id, url });
    }
    out
}
