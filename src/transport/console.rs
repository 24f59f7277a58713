//! Development backend that logs emails instead of sending them.

use async_trait::async_trait;
use tracing::info;

use super::{Mailer, OutgoingEmail, TransportError};

#[derive(Debug, Default, Clone)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        if !email.to.contains('@') {
            return Err(TransportError::InvalidAddress(email.to.clone()));
        }
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "Console mail backend: message not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_mailer_accepts_valid_address() {
        let mailer = ConsoleMailer::new();
        let email = OutgoingEmail::new("news@example.com", "a@x.com", "Hi", "Hello");
        assert!(mailer.send(&email).await.is_ok());
    }

    #[tokio::test]
    async fn test_console_mailer_rejects_garbage() {
        let mailer = ConsoleMailer::new();
        let email = OutgoingEmail::new("news@example.com", "nobody", "Hi", "Hello");
        assert!(matches!(
            mailer.send(&email).await,
            Err(TransportError::InvalidAddress(_))
        ));
    }
}
