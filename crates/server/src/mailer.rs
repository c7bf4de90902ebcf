//! SMTP delivery for escalation notices.

use std::time::Duration;

use async_trait::async_trait;
use deskbot_agent::{Notifier, NotifyError};
use deskbot_core::config::EscalationConfig;
use deskbot_core::ApplicationError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::debug;

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpNotifier {
    /// `Ok(None)` when the relay host or credentials are missing.
    pub fn from_config(config: &EscalationConfig) -> Result<Option<Self>, ApplicationError> {
        let (Some(host), Some(username), Some(password), Some(sender)) = (
            config.smtp_host.as_deref(),
            config.smtp_username.as_deref(),
            config.smtp_password.as_ref(),
            config.sender(),
        ) else {
            return Ok(None);
        };
        if !config.transport_configured() {
            return Ok(None);
        }

        let sender = parse_mailbox(sender)
            .map_err(|error| ApplicationError::Integration(format!("smtp sender: {error}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host.trim())
            .map_err(|error| ApplicationError::Integration(format!("smtp relay `{host}`: {error}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                username.to_string(),
                password.expose_secret().to_string(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Some(Self { transport, sender }))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = compose(&self.sender, recipient, subject, body)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|error| NotifyError::Delivery(error.to_string()))?;
        debug!(code = %response.code(), "smtp relay accepted escalation");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.trim().parse::<Mailbox>().map_err(|error| NotifyError::InvalidAddress {
        address: address.to_string(),
        reason: error.to_string(),
    })
}

fn compose(sender: &Mailbox, recipient: &str, subject: &str, body: &str) -> Result<Message, NotifyError> {
    Message::builder()
        .from(sender.clone())
        .to(parse_mailbox(recipient)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|error| NotifyError::Delivery(format!("failed to build message: {error}")))
}
