//! Mailing domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Maximum length of a message subject, in characters.
pub const MAX_SUBJECT_LENGTH: usize = 255;

/// Maximum length of a recipient's full name, in characters.
pub const MAX_FULL_NAME_LENGTH: usize = 255;

/// Lifecycle of a mailing. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum MailingStatus {
    #[default]
    Created,
    Started,
    Finished,
}

impl MailingStatus {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MailingStatus::Created => "created",
            MailingStatus::Started => "started",
            MailingStatus::Finished => "finished",
        }
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            MailingStatus::Created => "Создана",
            MailingStatus::Started => "Запущена",
            MailingStatus::Finished => "Завершена",
        }
    }

    /// Status after a dispatch batch: `created` becomes `started`,
    /// anything else is kept.
    pub fn after_dispatch(self) -> Self {
        match self {
            MailingStatus::Created => MailingStatus::Started,
            other => other,
        }
    }
}

impl fmt::Display for MailingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MailingStatus::Created),
            "started" => Ok(MailingStatus::Started),
            "finished" => Ok(MailingStatus::Finished),
            _ => Err(format!("unknown mailing status: {s}")),
        }
    }
}

/// Outcome of a single send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "success",
            AttemptStatus::Failed => "failed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "Успешно",
            AttemptStatus::Failed => "Не успешно",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mailing list recipient.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Recipient {
    pub id: i64,
    /// Unique across all recipients.
    pub email: String,
    pub full_name: String,
    pub comment: String,
    pub owner_id: i64,
    pub created_at: String,
}

/// Data for creating a recipient.
#[derive(Debug, Clone)]
pub struct NewRecipient {
    pub email: String,
    pub full_name: String,
    pub comment: String,
    pub owner_id: i64,
}

impl NewRecipient {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, owner_id: i64) -> Self {
        Self {
            email: email.into(),
            full_name: full_name.into(),
            comment: String::new(),
            owner_id,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Changes to a recipient. The owner cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct RecipientUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub comment: Option<String>,
}

impl RecipientUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none() && self.comment.is_none()
    }
}

/// An email message template.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub subject: String,
    pub body: String,
    pub owner_id: i64,
    pub created_at: String,
}

/// Data for creating a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub subject: String,
    pub body: String,
    pub owner_id: i64,
}

impl NewMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, owner_id: i64) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            owner_id,
        }
    }
}

/// Changes to a message.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl MessageUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.body.is_none()
    }
}

/// A pairing of one message with a set of recipients.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Mailing {
    pub id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: MailingStatus,
    pub message_id: i64,
    pub owner_id: i64,
    pub created_at: String,
}

/// Data for creating a mailing. New mailings always start as `created`.
#[derive(Debug, Clone)]
pub struct NewMailing {
    pub message_id: i64,
    pub owner_id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub recipient_ids: Vec<i64>,
}

impl NewMailing {
    pub fn new(message_id: i64, owner_id: i64) -> Self {
        Self {
            message_id,
            owner_id,
            start_time: None,
            end_time: None,
            recipient_ids: Vec::new(),
        }
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_recipients(mut self, recipient_ids: Vec<i64>) -> Self {
        self.recipient_ids = recipient_ids;
        self
    }
}

/// User-editable changes to a mailing.
///
/// Status and owner are deliberately absent: status is driven by the
/// dispatch engine only.
#[derive(Debug, Clone, Default)]
pub struct MailingUpdate {
    pub message_id: Option<i64>,
    pub start_time: Option<Option<DateTime<Utc>>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    /// Replaces the whole recipient set.
    pub recipient_ids: Option<Vec<i64>>,
}

impl MailingUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn start_time(mut self, start_time: Option<DateTime<Utc>>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn end_time(mut self, end_time: Option<DateTime<Utc>>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn recipients(mut self, recipient_ids: Vec<i64>) -> Self {
        self.recipient_ids = Some(recipient_ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.message_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.recipient_ids.is_none()
    }
}

/// One recorded send outcome.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MailingAttempt {
    pub id: i64,
    pub mailing_id: i64,
    pub attempt_time: DateTime<Utc>,
    pub status: AttemptStatus,
    /// Fixed text on success, the transport error text on failure.
    pub server_response: String,
}

/// Data for recording an attempt.
#[derive(Debug, Clone)]
pub struct NewMailingAttempt {
    pub mailing_id: i64,
    pub attempt_time: DateTime<Utc>,
    pub status: AttemptStatus,
    pub server_response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailing_status_round_trip() {
        for status in [
            MailingStatus::Created,
            MailingStatus::Started,
            MailingStatus::Finished,
        ] {
            assert_eq!(status.as_str().parse::<MailingStatus>(), Ok(status));
        }
        assert!("running".parse::<MailingStatus>().is_err());
    }

    #[test]
    fn test_after_dispatch_only_moves_forward() {
        assert_eq!(
            MailingStatus::Created.after_dispatch(),
            MailingStatus::Started
        );
        assert_eq!(
            MailingStatus::Started.after_dispatch(),
            MailingStatus::Started
        );
        assert_eq!(
            MailingStatus::Finished.after_dispatch(),
            MailingStatus::Finished
        );
    }

    #[test]
    fn test_status_ordering() {
        assert!(MailingStatus::Created < MailingStatus::Started);
        assert!(MailingStatus::Started < MailingStatus::Finished);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(RecipientUpdate::new().is_empty());
        assert!(!RecipientUpdate::new().comment("").is_empty());
        assert!(MessageUpdate::new().is_empty());
        assert!(!MessageUpdate::new().body("x").is_empty());
        assert!(MailingUpdate::new().is_empty());
        assert!(!MailingUpdate::new().recipients(vec![]).is_empty());
        assert!(!MailingUpdate::new().start_time(None).is_empty());
    }
}
