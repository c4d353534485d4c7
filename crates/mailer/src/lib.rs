//! Email delivery abstraction for Renovo.
//!
//! This crate owns the message shape and the [`EmailSender`] trait; it does
//! not implement transport. The production implementation hands rendered
//! messages to an external delivery provider over HTTP, and the test
//! doubles discard, log, or record them.
//!
//! # Example
//!
//! ```no_run
//! use mailer::{EmailMessage, EmailSender, LoggingSender};
//!
//! # async fn example() -> Result<(), mailer::MailerError> {
//! let sender = LoggingSender;
//! let message = EmailMessage {
//!     recipient: "dana@example.com".to_string(),
//!     subject: "Welcome".to_string(),
//!     html: "<p>Welcome aboard</p>".to_string(),
//!     text: "Welcome aboard".to_string(),
//! };
//! sender.send(&message).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while handing a message to the provider.
#[derive(Debug, Error)]
pub enum MailerError {
    /// Transport-level failure reaching the provider.
    #[error("delivery transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered but refused the message.
    #[error("delivery rejected with status {status}")]
    Rejected { status: u16 },
}

/// A rendered, ready-to-deliver message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Trait for handing rendered messages to a delivery collaborator.
///
/// Abstracted to support different providers and test doubles.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message. Implementations must not retry internally;
    /// the caller records the outcome and owns any rescheduling.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// A no-op sender for testing that discards all messages.
#[derive(Debug, Clone, Default)]
pub struct NoopSender;

#[async_trait]
impl EmailSender for NoopSender {
    async fn send(&self, _message: &EmailMessage) -> Result<(), MailerError> {
        Ok(())
    }
}

/// A sender that logs instead of delivering. Used when no provider is
/// configured (local development, dry runs).
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl EmailSender for LoggingSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "Dry-run send (no delivery provider configured)"
        );
        Ok(())
    }
}

/// A recording sender for tests: captures every message and can be told to
/// fail.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: std::sync::Mutex<Vec<EmailMessage>>,
    fail_with: std::sync::Mutex<Option<u16>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with the given provider status.
    pub fn fail_with_status(&self, status: u16) {
        *self.fail_with.lock().unwrap() = Some(status);
    }

    /// Stop failing.
    pub fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        if let Some(status) = *self.fail_with.lock().unwrap() {
            return Err(MailerError::Rejected { status });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Production sender: POSTs the message as JSON to a delivery-provider
/// webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSender {
    /// Create a sender targeting the given provider endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EmailSender for WebhookSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!(recipient = %message.recipient, subject = %message.subject, "Delivering email");

        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailerError::Rejected {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            recipient: "dana@example.com".to_string(),
            subject: "Checking in".to_string(),
            html: "<p>hello</p>".to_string(),
            text: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_noop_sender() {
        let sender = NoopSender;
        sender.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_logging_sender() {
        let sender = LoggingSender;
        sender.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_recording_sender_captures_and_fails() {
        let sender = RecordingSender::new();

        sender.send(&message()).await.unwrap();
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(sender.sent()[0].recipient, "dana@example.com");

        sender.fail_with_status(502);
        let err = sender.send(&message()).await.unwrap_err();
        assert!(matches!(err, MailerError::Rejected { status: 502 }));
        // Failed sends are not recorded
        assert_eq!(sender.sent().len(), 1);

        sender.succeed();
        sender.send(&message()).await.unwrap();
        assert_eq!(sender.sent().len(), 2);
    }
}
