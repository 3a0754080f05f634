//! SMTP mailer built on lettre's async transport.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use jobhub_core::models::EmailJob;
use jobhub_core::{Config, Mailer};

use crate::templates;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create the mailer from config. SMTP_HOST and SMTP_FROM are required;
    /// credentials are optional (open relays in development).
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .context("SMTP_HOST must be set")?;
        let from: Mailbox = config
            .smtp_from
            .as_deref()
            .context("SMTP_FROM must be set")?
            .parse()
            .context("Invalid SMTP_FROM address")?;
        let port = config.smtp_port.unwrap_or(587);

        let transport = if config.smtp_tls {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .context("Failed to build SMTP STARTTLS transport")?
                .port(port);
            let b = if let (Some(u), Some(p)) = (&config.smtp_user, &config.smtp_password) {
                b.credentials(Credentials::new(u.clone(), p.clone()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "SMTP mailer initialized (STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = if let (Some(u), Some(p)) = (&config.smtp_user, &config.smtp_password) {
                b.credentials(Credentials::new(u.clone(), p.clone()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "SMTP mailer initialized (plaintext)");
            b.build()
        };

        Ok(Self {
            transport: Arc::new(transport),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, job: &EmailJob) -> Result<()> {
        let to: Mailbox = job
            .recipient()
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", job.recipient()))?;

        let template = templates::render(job);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(template.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(template.body)
            .context("Failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;

        tracing::info!(
            event_name = %job.event_name(),
            recipient = %job.recipient(),
            "Email sent"
        );
        Ok(())
    }
}
