//! In-memory backend recording every email, with scripted failures.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Mailer, OutgoingEmail, TransportError};

/// Records sent emails and fails for configured recipient addresses.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failures: Mutex<HashMap<String, String>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail with an SMTP error carrying `message`.
    pub fn fail_for(self, address: impl Into<String>, message: impl Into<String>) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(address.into(), message.into());
        }
        self
    }

    /// Emails delivered so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Recipient addresses of delivered emails, in order.
    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.to).collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|f| f.get(&email.to).cloned());
        if let Some(message) = failure {
            return Err(TransportError::Smtp(message));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sent_emails() {
        let mailer = MemoryMailer::new();
        mailer
            .send(&OutgoingEmail::new("f@x.com", "a@x.com", "Hi", "Hello"))
            .await
            .unwrap();

        assert_eq!(mailer.recipients(), vec!["a@x.com".to_string()]);
        assert_eq!(mailer.sent()[0].subject, "Hi");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mailer = MemoryMailer::new().fail_for("b@x.com", "SMTP timeout");
        let err = mailer
            .send(&OutgoingEmail::new("f@x.com", "b@x.com", "Hi", "Hello"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "SMTP timeout");
        assert!(mailer.sent().is_empty());
    }
}
