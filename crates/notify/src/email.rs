//! SMTP mail channel via `lettre`.
//!
//! Sends one plain-text message per notification to a single recipient.
//! Without a configured recipient the channel is a logged no-op.

use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use trigger_core::MailConfig;

use crate::templating::TemplateRenderer;
use crate::traits::{Delivery, NotifyError, TaskNotification};

#[derive(Debug)]
pub struct MailChannel {
    /// Present only when a recipient is configured.
    target: Option<MailTarget>,
    renderer: TemplateRenderer,
}

#[derive(Debug)]
struct MailTarget {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, NotifyError> {
    raw.parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::Config(format!("{raw}: {e}")))
}

impl MailChannel {
    /// Build the channel from mail settings.
    ///
    /// Port 465 uses implicit TLS; other ports use STARTTLS when `tls` is
    /// set and plain SMTP otherwise. Credentials come from `SMTP_USERNAME`
    /// and `SMTP_PASSWORD` when both are set.
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let renderer = TemplateRenderer::new()?;

        let Some(to) = config.to.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(Self {
                target: None,
                renderer,
            });
        };

        let to = parse_mailbox(to)?;
        let from = Mailbox::new(
            Some(config.from_name.clone()),
            config
                .from_address
                .parse()
                .map_err(|e: lettre::address::AddressError| {
                    NotifyError::Config(format!("{}: {e}", config.from_address))
                })?,
        );

        let host = config.smtp_host.as_str();
        let port = config.smtp_port;
        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
        };

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            target: Some(MailTarget {
                transport: builder.build(),
                from,
                to,
            }),
            renderer,
        })
    }

    pub fn recipient(&self) -> Option<&Mailbox> {
        self.target.as_ref().map(|t| &t.to)
    }

    pub async fn send(&self, n: &TaskNotification) -> Result<Delivery, NotifyError> {
        let Some(target) = &self.target else {
            tracing::warn!(task = %n.task, "mail recipient not configured, skipping");
            return Ok(Delivery::Skipped);
        };

        let body = self.renderer.mail_body(n)?;
        let email = Message::builder()
            .from(target.from.clone())
            .to(target.to.clone())
            .subject(n.title())
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        target
            .transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::debug!(task = %n.task, to = %target.to, "mail notification delivered");
        Ok(Delivery::Sent)
    }
}
