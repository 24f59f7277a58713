//! Response DTOs for the Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::datetime::sqlite_to_rfc3339;
use crate::db::User;
use crate::dispatch::DispatchSummary;
use crate::mailing::{Mailing, MailingAttempt, MailingDetails, Message, Recipient};

/// `{"data": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Auth DTOs
// ============================================================================

/// Login and registration response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Short user summary.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

/// Token refresh response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Current user (`/api/auth/me`, `/api/users/me`).
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub groups: Vec<String>,
    pub is_manager: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
}

impl MeResponse {
    pub fn new(user: User, groups: Vec<String>, is_manager: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            country: user.country,
            groups,
            is_manager,
            created_at: sqlite_to_rfc3339(&user.created_at),
            last_login_at: user.last_login.as_deref().map(sqlite_to_rfc3339),
        }
    }
}

/// Plain acknowledgement carrying a user-facing message.
#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub message: String,
}

// ============================================================================
// Mailing DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RecipientResponse {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub comment: String,
    pub owner_id: i64,
    pub created_at: String,
}

impl From<Recipient> for RecipientResponse {
    fn from(r: Recipient) -> Self {
        Self {
            id: r.id,
            email: r.email,
            full_name: r.full_name,
            comment: r.comment,
            owner_id: r.owner_id,
            created_at: sqlite_to_rfc3339(&r.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub subject: String,
    pub body: String,
    pub owner_id: i64,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            subject: m.subject,
            body: m.body,
            owner_id: m.owner_id,
            created_at: sqlite_to_rfc3339(&m.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MailingResponse {
    pub id: i64,
    /// `created`, `started` or `finished`.
    pub status: String,
    pub status_display: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub message_id: i64,
    pub owner_id: i64,
    pub created_at: String,
}

impl From<Mailing> for MailingResponse {
    fn from(m: Mailing) -> Self {
        Self {
            id: m.id,
            status: m.status.as_str().to_string(),
            status_display: m.status.display_name().to_string(),
            start_time: m.start_time,
            end_time: m.end_time,
            message_id: m.message_id,
            owner_id: m.owner_id,
            created_at: sqlite_to_rfc3339(&m.created_at),
        }
    }
}

/// Mailing with its message and recipients.
#[derive(Debug, Serialize)]
pub struct MailingDetailResponse {
    #[serde(flatten)]
    pub mailing: MailingResponse,
    pub message: MessageResponse,
    pub recipients: Vec<RecipientResponse>,
}

impl From<MailingDetails> for MailingDetailResponse {
    fn from(d: MailingDetails) -> Self {
        Self {
            mailing: d.mailing.into(),
            message: d.message.into(),
            recipients: d.recipients.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub id: i64,
    pub mailing_id: i64,
    pub attempt_time: DateTime<Utc>,
    /// `success` or `failed`.
    pub status: String,
    pub server_response: String,
}

impl From<MailingAttempt> for AttemptResponse {
    fn from(a: MailingAttempt) -> Self {
        Self {
            id: a.id,
            mailing_id: a.mailing_id,
            attempt_time: a.attempt_time,
            status: a.status.as_str().to_string(),
            server_response: a.server_response,
        }
    }
}

/// Result of `POST /api/mailings/{id}/send`.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub success: usize,
    pub failed: usize,
    pub message: String,
}

impl From<DispatchSummary> for DispatchResponse {
    fn from(s: DispatchSummary) -> Self {
        Self {
            success: s.success,
            failed: s.failed,
            message: s.notice(),
        }
    }
}
