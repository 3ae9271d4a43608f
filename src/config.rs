// src/config.rs
//! Runtime configuration, read from the environment (and `.env` via dotenvy).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::ingest::config::{load_sources_default, SourceConfig};
use crate::listing::KeyPolicy;
use crate::notify::{email, notion, EmailConfig, NotionConfig};

pub const DEFAULT_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_SEEN_DB: &str = "seen.db";
pub const DEFAULT_SINK_PACING_MS: u64 = 350;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: Vec<SourceConfig>,
    pub poll_interval: Duration,
    pub seen_db: PathBuf,
    pub key_policy: KeyPolicy,
    pub skip_inactive: bool,
    pub sink_pacing: Duration,
    pub http_timeout: Duration,
    pub email: Option<EmailConfig>,
    pub notion: Option<NotionConfig>,
    pub admin_addr: Option<SocketAddr>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Build from the process environment. Fails on malformed values and
    /// when no sink is configured.
    pub fn from_env() -> Result<Self> {
        let interval_min: u64 = env_parse("CHECK_INTERVAL_MINUTES")?.unwrap_or(DEFAULT_INTERVAL_MINUTES);
        if interval_min == 0 {
            bail!("CHECK_INTERVAL_MINUTES must be at least 1");
        }

        let key_policy = match env_opt("CANONICAL_FIELDS") {
            Some(v) => v
                .parse::<KeyPolicy>()
                .map_err(|e| anyhow!("CANONICAL_FIELDS: {e}"))?,
            None => KeyPolicy::default(),
        };

        let email = match (env_opt("FROM_EMAIL"), env_opt("EMAIL_PASSWORD"), env_opt("TO_EMAIL")) {
            (Some(from), Some(password), Some(to)) => Some(EmailConfig {
                smtp_host: env_opt("SMTP_HOST")
                    .unwrap_or_else(|| email::DEFAULT_SMTP_HOST.to_string()),
                from,
                password,
                to,
            }),
            (None, None, None) => None,
            _ => bail!("email sink needs FROM_EMAIL, EMAIL_PASSWORD and TO_EMAIL together"),
        };

        let notion = match (env_opt("NOTION_TOKEN"), env_opt("NOTION_DB_ID")) {
            (Some(token), Some(database_id)) => Some(NotionConfig {
                token,
                database_id,
                api_base: env_opt("NOTION_API_BASE")
                    .unwrap_or_else(|| notion::DEFAULT_API_BASE.to_string()),
            }),
            (None, None) => None,
            _ => bail!("notion sink needs NOTION_TOKEN and NOTION_DB_ID together"),
        };

        if email.is_none() && notion.is_none() {
            bail!("no sink configured: set the email and/or notion variables");
        }

        let admin_addr = env_opt("ADMIN_ADDR")
            .map(|v| v.parse::<SocketAddr>().with_context(|| format!("ADMIN_ADDR={v}")))
            .transpose()?;

        let log_format = match env_opt("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            Some(f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            sources: load_sources_default()?,
            poll_interval: Duration::from_secs(interval_min * 60),
            seen_db: env_opt("SEEN_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SEEN_DB)),
            key_policy,
            skip_inactive: env_parse::<bool>("SKIP_INACTIVE")?.unwrap_or(false),
            sink_pacing: Duration::from_millis(
                env_parse("SINK_PACING_MS")?.unwrap_or(DEFAULT_SINK_PACING_MS),
            ),
            http_timeout: Duration::from_secs(
                env_parse("HTTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            email,
            notion,
            admin_addr,
            log_format,
        })
    }

    /// Shared client for feeds and the Notion API.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("opportuna/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")
    }
}

/// Non-empty, trimmed value of an env var.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(name)
        .map(|v| v.parse::<T>().map_err(|e| anyhow!("{name}={v}: {e}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const VARS: &[&str] = &[
        "CHECK_INTERVAL_MINUTES",
        "CANONICAL_FIELDS",
        "FROM_EMAIL",
        "EMAIL_PASSWORD",
        "TO_EMAIL",
        "SMTP_HOST",
        "NOTION_TOKEN",
        "NOTION_DB_ID",
        "NOTION_API_BASE",
        "ADMIN_ADDR",
        "SEEN_DB",
        "SKIP_INACTIVE",
        "SINK_PACING_MS",
        "HTTP_TIMEOUT_SECS",
        "LOG_FORMAT",
        crate::ingest::config::ENV_SOURCES_PATH,
    ];

    fn clear() {
        for v in VARS {
            env::remove_var(v);
        }
    }

    #[serial_test::serial]
    #[test]
    fn defaults_with_notion_only() {
        clear();
        env::set_var("NOTION_TOKEN", "t");
        env::set_var("NOTION_DB_ID", "db");

        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(30 * 60));
        assert_eq!(cfg.seen_db, PathBuf::from("seen.db"));
        assert_eq!(cfg.key_policy, KeyPolicy::default());
        assert!(cfg.email.is_none());
        assert_eq!(cfg.notion.unwrap().api_base, "https://api.notion.com");
        assert_eq!(cfg.sink_pacing, Duration::from_millis(350));
        assert!(cfg.admin_addr.is_none());
        clear();
    }

    #[serial_test::serial]
    #[test]
    fn missing_sinks_is_an_error() {
        clear();
        assert!(AppConfig::from_env().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn partial_email_settings_are_rejected() {
        clear();
        env::set_var("FROM_EMAIL", "bot@example.test");
        env::set_var("TO_EMAIL", "me@example.test");
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("EMAIL_PASSWORD"));
        clear();
    }

    #[serial_test::serial]
    #[test]
    fn overrides_are_parsed() {
        clear();
        env::set_var("FROM_EMAIL", "bot@example.test");
        env::set_var("EMAIL_PASSWORD", "pw");
        env::set_var("TO_EMAIL", "me@example.test");
        env::set_var("CHECK_INTERVAL_MINUTES", "5");
        env::set_var("CANONICAL_FIELDS", "company,title,location");
        env::set_var("SKIP_INACTIVE", "true");
        env::set_var("ADMIN_ADDR", "127.0.0.1:8088");
        env::set_var("LOG_FORMAT", "JSON");

        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(300));
        assert!(cfg.key_policy.location && !cfg.key_policy.term && !cfg.key_policy.source);
        assert!(cfg.skip_inactive);
        assert_eq!(cfg.admin_addr.unwrap().port(), 8088);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.email.unwrap().smtp_host, "smtp.gmail.com");
        clear();
    }

    #[serial_test::serial]
    #[test]
    fn bad_numbers_fail_loudly() {
        clear();
        env::set_var("NOTION_TOKEN", "t");
        env::set_var("NOTION_DB_ID", "db");
        env::set_var("CHECK_INTERVAL_MINUTES", "soon");
        assert!(AppConfig::from_env().is_err());
        clear();
    }
}
