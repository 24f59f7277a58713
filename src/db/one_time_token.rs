//! Single-use tokens, used for password reset links.
//!
//! Only the SHA-256 hash of a token is stored; the plain value exists
//! solely in the email sent to the user.

use sha2::{Digest, Sha256};

use super::DbPool;
use crate::{MailcastError, Result};

const TOKEN_COLUMNS: &str = "id, user_id, token_hash, purpose, expires_at, created_at, used_at";

/// Token purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Password reset confirmation.
    PasswordReset,
}

impl TokenPurpose {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Hex-encoded SHA-256 of a plain token.
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// One-time token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OneTimeToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub purpose: String,
    pub expires_at: String,
    pub created_at: String,
    pub used_at: Option<String>,
}

impl OneTimeToken {
    /// Check if the token has been used.
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// New one-time token for creation.
pub struct NewOneTimeToken {
    pub user_id: i64,
    /// Plain token; hashed before it is stored.
    pub token: String,
    pub purpose: TokenPurpose,
    pub expires_at: String,
}

/// Repository for one-time token operations.
pub struct OneTimeTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> OneTimeTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new token (hashed).
    pub async fn create(&self, new_token: &NewOneTimeToken) -> Result<OneTimeToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO one_time_tokens (user_id, token_hash, purpose, expires_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(new_token.user_id)
        .bind(hash_token(&new_token.token))
        .bind(new_token.purpose.as_str())
        .bind(&new_token.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("one-time token".to_string()))
    }

    /// Get a token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<OneTimeToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM one_time_tokens WHERE id = ?");
        sqlx::query_as::<_, OneTimeToken>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Mark a valid (unexpired, unused) token as used and return it.
    ///
    /// The update is a single statement, so a token can be consumed once
    /// even under concurrent requests.
    pub async fn consume_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<OneTimeToken>> {
        let sql = format!(
            "UPDATE one_time_tokens
             SET used_at = datetime('now')
             WHERE token_hash = ?
               AND purpose = ?
               AND used_at IS NULL
               AND expires_at > datetime('now')
             RETURNING {TOKEN_COLUMNS}"
        );
        sqlx::query_as::<_, OneTimeToken>(&sql)
            .bind(hash_token(token))
            .bind(purpose.as_str())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Delete expired and used tokens.
    pub async fn cleanup(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM one_time_tokens WHERE expires_at < datetime('now') OR used_at IS NOT NULL",
        )
        .execute(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Delete all tokens of a user for the given purpose.
    pub async fn delete_for_user(&self, user_id: i64, purpose: TokenPurpose) -> Result<u64> {
        let result = sqlx::query("DELETE FROM one_time_tokens WHERE user_id = ? AND purpose = ?")
            .bind(user_id)
            .bind(purpose.as_str())
            .execute(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::new(db.pool())
            .create(&NewUser::new("testuser", "hash"))
            .await
            .unwrap();
        db
    }

    fn reset_token(token: &str, expires_at: &str) -> NewOneTimeToken {
        NewOneTimeToken {
            user_id: 1,
            token: token.to_string(),
            purpose: TokenPurpose::PasswordReset,
            expires_at: expires_at.to_string(),
        }
    }

    #[test]
    fn test_hash_token() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_token_is_stored_hashed() {
        let db = setup_db().await;
        let repo = OneTimeTokenRepository::new(db.pool());

        let stored = repo
            .create(&reset_token("plain-token", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert_ne!(stored.token_hash, "plain-token");
        assert_eq!(stored.token_hash, hash_token("plain-token"));
        assert_eq!(stored.purpose, "password_reset");
        assert!(!stored.is_used());
    }

    #[tokio::test]
    async fn test_consume_once() {
        let db = setup_db().await;
        let repo = OneTimeTokenRepository::new(db.pool());
        repo.create(&reset_token("reset", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        let consumed = repo
            .consume_token("reset", TokenPurpose::PasswordReset)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(consumed.user_id, 1);
        assert!(consumed.is_used());

        let second = repo
            .consume_token("reset", TokenPurpose::PasswordReset)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_consume_expired_token() {
        let db = setup_db().await;
        let repo = OneTimeTokenRepository::new(db.pool());
        repo.create(&reset_token("expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        let consumed = repo
            .consume_token("expired", TokenPurpose::PasswordReset)
            .await
            .unwrap();
        assert!(consumed.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_and_delete_for_user() {
        let db = setup_db().await;
        let repo = OneTimeTokenRepository::new(db.pool());
        repo.create(&reset_token("expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&reset_token("live", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert_eq!(repo.cleanup().await.unwrap(), 1);
        assert_eq!(
            repo.delete_for_user(1, TokenPurpose::PasswordReset)
                .await
                .unwrap(),
            1
        );
    }
}
