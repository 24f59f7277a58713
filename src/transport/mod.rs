//! Outbound mail transport.
//!
//! The dispatch engine only needs "send one email"; the backends here are
//! SMTP (lettre), a console logger for development and an in-memory
//! recorder for tests.

mod console;
mod memory;
mod smtp;

pub use console::ConsoleMailer;
pub use memory::MemoryMailer;
pub use smtp::SmtpMailer;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{MailBackend, MailConfig};

/// Transport failures.
///
/// The text of an SMTP error is stored verbatim as the attempt diagnostic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("{0}")]
    Smtp(String),
}

/// A single plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Async email sending capability.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Send one email. Any delivery problem is a [`TransportError`].
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;
}

/// Build the configured mail backend.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, TransportError> {
    match config.backend {
        MailBackend::Smtp => Ok(Arc::new(SmtpMailer::from_config(config)?)),
        MailBackend::Console => Ok(Arc::new(ConsoleMailer::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smtp_error_text_is_verbatim() {
        let err = TransportError::Smtp("SMTP timeout".to_string());
        assert_eq!(err.to_string(), "SMTP timeout");
    }

    #[test]
    fn test_invalid_address_display() {
        let err = TransportError::InvalidAddress("nope".to_string());
        assert_eq!(err.to_string(), "invalid email address: nope");
    }

    #[test]
    fn test_build_console_mailer() {
        let config = MailConfig {
            backend: MailBackend::Console,
            ..Default::default()
        };
        assert!(build_mailer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_build_smtp_mailer() {
        let config = MailConfig {
            host: "smtp.example.com".to_string(),
            from: "news@example.com".to_string(),
            ..Default::default()
        };
        assert!(build_mailer(&config).is_ok());
    }
}
