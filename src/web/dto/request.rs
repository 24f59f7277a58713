//! Request DTOs for the Web API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed, required_text};
use crate::mailing::{MailingForm, MessageForm, RecipientForm};

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Logout request.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to invalidate.
    pub refresh_token: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Profile update. Absent fields are left unchanged, empty strings clear.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Password reset request.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password reset confirmation.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub new_password: String,
}

/// Create or replace a recipient.
#[derive(Debug, Deserialize, Validate)]
pub struct RecipientRequest {
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    #[validate(custom(function = "required_text"))]
    #[validate(length(max = 255, message = "Ф.И.О. не должно превышать 255 символов."))]
    pub full_name: String,
    #[serde(default)]
    #[validate(custom(function = "no_control_chars"))]
    pub comment: String,
}

impl From<RecipientRequest> for RecipientForm {
    fn from(req: RecipientRequest) -> Self {
        RecipientForm {
            email: req.email,
            full_name: req.full_name,
            comment: req.comment,
        }
    }
}

/// Create or replace a message.
#[derive(Debug, Deserialize, Validate)]
pub struct MessageRequest {
    #[validate(custom(function = "required_text"))]
    #[validate(length(max = 255, message = "Длина темы не должна превышать 255 символов."))]
    pub subject: String,
    #[validate(custom(function = "not_empty_trimmed"))]
    pub body: String,
}

impl From<MessageRequest> for MessageForm {
    fn from(req: MessageRequest) -> Self {
        MessageForm {
            subject: req.subject,
            body: req.body,
        }
    }
}

/// Create or replace a mailing. Times are RFC 3339; status is not accepted.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MailingRequest {
    pub message_id: i64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recipient_ids: Vec<i64>,
}

impl From<MailingRequest> for MailingForm {
    fn from(req: MailingRequest) -> Self {
        MailingForm {
            message_id: req.message_id,
            start_time: req.start_time,
            end_time: req.end_time,
            recipient_ids: req.recipient_ids,
        }
    }
}
