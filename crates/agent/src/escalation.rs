use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deskbot_core::config::EscalationConfig;
use deskbot_core::domain::escalation::ESCALATION_SUBJECT;
use deskbot_core::{EscalationOutcome, EscalationRequest};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("{0}")]
    Delivery(String),
    #[error("notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Outbound hand-off to a human support channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

pub struct EscalationService {
    notifier: Option<Arc<dyn Notifier>>,
    recipient: Option<String>,
    transport_ready: bool,
    timeout: Duration,
}

impl EscalationService {
    pub fn new(config: &EscalationConfig, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            notifier,
            recipient: config.recipient().map(ToString::to_string),
            transport_ready: config.transport_configured(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.recipient.is_some() && self.transport_ready && self.notifier.is_some()
    }

    /// Never fails: missing configuration and notifier errors become a failed outcome.
    pub async fn submit(&self, request: &EscalationRequest) -> EscalationOutcome {
        let (Some(notifier), Some(recipient), true) =
            (&self.notifier, self.recipient.as_deref(), self.transport_ready)
        else {
            warn!(
                event_name = "escalation.not_configured",
                "escalation requested but notifier is not configured"
            );
            return EscalationOutcome::not_configured();
        };

        let body = request.notification_body();
        let sent = tokio::time::timeout(
            self.timeout,
            notifier.notify(recipient, ESCALATION_SUBJECT, &body),
        )
        .await
        .unwrap_or(Err(NotifyError::Timeout(self.timeout)));

        match sent {
            Ok(()) => {
                info!(
                    event_name = "escalation.sent",
                    metadata_keys = request.metadata.len(),
                    "escalation forwarded to support"
                );
                EscalationOutcome::success()
            }
            Err(error) => {
                warn!(event_name = "escalation.failed", error = %error, "escalation delivery failed");
                EscalationOutcome::failure(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use deskbot_core::config::EscalationConfig;
    use deskbot_core::{EscalationOutcome, EscalationRequest};
    use serde_json::{json, Map};

    use super::{EscalationService, Notifier, NotifyError};

    #[derive(Default)]
    struct RecordingNotifier {
        fail_with: Option<String>,
        hang: bool,
        calls: AtomicUsize,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if let Some(message) = &self.fail_with {
                return Err(NotifyError::Delivery(message.clone()));
            }
            self.sent.lock().expect("sent lock").push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    fn configured() -> EscalationConfig {
        EscalationConfig {
            support_email: Some("support@example.com".to_string()),
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: 587,
            smtp_username: Some("bot@example.com".to_string()),
            smtp_password: Some("secret".to_string().into()),
            smtp_from: None,
            timeout_secs: 30,
        }
    }

    fn request() -> EscalationRequest {
        let mut metadata = Map::new();
        metadata.insert("session_id".to_string(), json!("s-42"));
        EscalationRequest::new("My order never arrived", metadata, "jane@example.com")
    }

    #[tokio::test]
    async fn missing_recipient_returns_not_configured_without_calling_notifier() {
        let notifier = Arc::new(RecordingNotifier::default());
        let config = EscalationConfig { support_email: None, ..configured() };
        let service = EscalationService::new(&config, Some(notifier.clone()));

        let outcome = service.submit(&request()).await;

        assert_eq!(outcome, EscalationOutcome::failure("Email not configured on server."));
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
        assert!(!service.is_ready());
    }

    #[tokio::test]
    async fn missing_transport_returns_not_configured_without_calling_notifier() {
        let notifier = Arc::new(RecordingNotifier::default());
        let config = EscalationConfig { smtp_host: None, smtp_password: None, ..configured() };
        let service = EscalationService::new(&config, Some(notifier.clone()));

        let outcome = service.submit(&request()).await;

        assert_eq!(outcome.error.as_deref(), Some("Email not configured on server."));
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_notification_returns_ok_with_fixed_subject() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = EscalationService::new(&configured(), Some(notifier.clone()));

        let outcome = service.submit(&request()).await;

        assert_eq!(outcome, EscalationOutcome::success());
        let sent = notifier.sent.lock().expect("sent lock");
        assert_eq!(sent.len(), 1);
        let (recipient, subject, body) = &sent[0];
        assert_eq!(recipient, "support@example.com");
        assert_eq!(subject, "Escalation request from AI bot");
        assert!(body.contains("Query:\nMy order never arrived"));
        assert!(body.contains("\"session_id\": \"s-42\""));
        assert!(body.ends_with("User contact:\njane@example.com\n"));
    }

    #[tokio::test]
    async fn failing_notifier_surfaces_its_message() {
        let notifier = Arc::new(RecordingNotifier {
            fail_with: Some("relay rejected credentials".to_string()),
            ..RecordingNotifier::default()
        });
        let service = EscalationService::new(&configured(), Some(notifier));

        let outcome = service.submit(&request()).await;

        assert_eq!(outcome, EscalationOutcome::failure("relay rejected credentials"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_notifier_times_out_into_failure() {
        let notifier = Arc::new(RecordingNotifier { hang: true, ..RecordingNotifier::default() });
        let service = EscalationService::new(&configured(), Some(notifier));

        let outcome = service.submit(&request()).await;

        assert!(!outcome.ok);
        assert!(outcome.error.unwrap_or_default().contains("timed out"));
    }
}
