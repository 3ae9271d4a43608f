use std::time::Duration;

use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Sink;
use crate::error::SinkError;
use crate::listing::Listing;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// Sender address, also the SMTP login.
    pub from: String,
    /// App password for the sender account.
    pub password: String,
    pub to: String,
}

pub struct EmailSink {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSink {
    /// SMTP over implicit TLS (port 465) with login credentials.
    pub fn new(cfg: &EmailConfig, timeout: Duration) -> Result<Self> {
        let from = cfg.from.parse::<Mailbox>().context("invalid FROM_EMAIL")?;
        let to = cfg.to.parse::<Mailbox>().context("invalid TO_EMAIL")?;

        let creds = Credentials::new(cfg.from.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .with_context(|| format!("invalid SMTP host {}", cfg.smtp_host))?
            .credentials(creds)
            .timeout(Some(timeout))
            .build();

        Ok(Self { mailer, from, to })
    }
}

/// Subject and plain-text body for one listing.
pub fn compose(l: &Listing) -> (String, String) {
    let subject = format!("New Internship Alert: {}", l.label());
    let body = format!(
        "Reeled in a new internship for you!\n\n\
         Company: {}\n\
         Title: {}\n\
         Term: {}\n\
         Location(s): {}\n\
         Date Posted: {}\n\
         Sponsorship: {}\n\
         Apply here: {}\n\n\
         Remember to swim fast, the best opportunities don't wait!\n\
         Opportuna\n",
        l.company,
        l.title,
        l.term,
        l.locations_display(),
        l.date_posted_display(),
        l.sponsorship,
        l.application_url_display(),
    );
    (subject, body)
}

#[async_trait::async_trait]
impl Sink for EmailSink {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, listing: &Listing) -> Result<(), SinkError> {
        let (subject, body) = compose(listing);

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| SinkError::new(self.name(), format!("build email: {e}")))?;

        self.mailer
            .send(msg)
            .await
            .map_err(|e| SinkError::new(self.name(), format!("send email: {e}")))?;
        tracing::info!(listing = %listing.label(), "email sent");
        Ok(())
    }
}
