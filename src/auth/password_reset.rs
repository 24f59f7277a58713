//! Password reset by emailed single-use token.

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::auth::hash_password;
use crate::auth::validation::validate_registration_password;
use crate::datetime::to_sqlite;
use crate::db::{
    DbPool, NewOneTimeToken, OneTimeTokenRepository, RefreshTokenRepository, TokenPurpose, User,
    UserRepository, UserUpdate,
};
use crate::transport::{Mailer, OutgoingEmail};
use crate::{MailcastError, Result};

/// Subject of the reset email.
pub const RESET_SUBJECT: &str = "Восстановление пароля";

/// Prefix of the body line carrying the token.
pub const RESET_CODE_PREFIX: &str = "Код: ";

/// Issues and redeems password reset tokens.
pub struct PasswordReset<'a> {
    pool: &'a DbPool,
    mailer: &'a dyn Mailer,
    sender: &'a str,
    expiry_secs: u64,
}

impl<'a> PasswordReset<'a> {
    pub fn new(pool: &'a DbPool, mailer: &'a dyn Mailer, sender: &'a str, expiry_secs: u64) -> Self {
        Self {
            pool,
            mailer,
            sender,
            expiry_secs,
        }
    }

    /// Email a reset token to the account registered with `email`.
    ///
    /// Unknown addresses succeed silently so callers cannot probe accounts.
    pub async fn request(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        let user = match UserRepository::new(self.pool).get_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                debug!("Password reset requested for unknown address");
                return Ok(());
            }
        };

        let tokens = OneTimeTokenRepository::new(self.pool);
        tokens
            .delete_for_user(user.id, TokenPurpose::PasswordReset)
            .await?;

        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::seconds(self.expiry_secs as i64);
        tokens
            .create(&NewOneTimeToken {
                user_id: user.id,
                token: token.clone(),
                purpose: TokenPurpose::PasswordReset,
                expires_at: to_sqlite(&expires_at),
            })
            .await?;

        let body = format!(
            "Здравствуйте, {}!\n\n\
             Для сброса пароля отправьте этот код вместе с новым паролем.\n\
             {RESET_CODE_PREFIX}{token}\n\n\
             Код действителен {} мин. Если вы не запрашивали сброс, просто проигнорируйте письмо.",
            user.username,
            self.expiry_secs / 60,
        );
        self.mailer
            .send(&OutgoingEmail::new(self.sender, &email, RESET_SUBJECT, body))
            .await?;

        info!(user_id = user.id, "Password reset email sent");
        Ok(())
    }

    /// Set a new password using a token from [`PasswordReset::request`].
    ///
    /// All sessions of the user are revoked.
    pub async fn confirm(&self, token: &str, new_password: &str) -> Result<User> {
        validate_registration_password(new_password, None)
            .map_err(|e| MailcastError::Validation(e.to_string()))?;

        let consumed = OneTimeTokenRepository::new(self.pool)
            .consume_token(token, TokenPurpose::PasswordReset)
            .await?
            .ok_or_else(|| {
                MailcastError::Validation("invalid or expired reset token".to_string())
            })?;

        let password_hash =
            hash_password(new_password).map_err(|e| MailcastError::Validation(e.to_string()))?;
        let user = UserRepository::new(self.pool)
            .update(consumed.user_id, &UserUpdate::new().password(password_hash))
            .await?
            .ok_or_else(|| MailcastError::NotFound("user".to_string()))?;

        RefreshTokenRepository::new(self.pool)
            .revoke_all_for_user(user.id)
            .await?;

        info!(user_id = user.id, "Password reset completed");
        Ok(user)
    }
}

/// Extract the token from a reset email body.
pub fn extract_reset_code(body: &str) -> Option<&str> {
    body.lines()
        .find_map(|line| line.strip_prefix(RESET_CODE_PREFIX))
        .map(str::trim)
}
