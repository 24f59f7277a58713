//! Refresh tokens backing JWT sessions.

use super::DbPool;
use crate::{MailcastError, Result};

const TOKEN_COLUMNS: &str = "id, user_id, token, expires_at, created_at, revoked_at";

/// Refresh token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    /// Opaque token string handed to the client.
    pub token: String,
    /// Expiration timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub expires_at: String,
    pub created_at: String,
    /// Revocation timestamp (None while the session is live).
    pub revoked_at: Option<String>,
}

/// New refresh token for creation.
pub struct NewRefreshToken {
    pub user_id: i64,
    pub token: String,
    pub expires_at: String,
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new refresh token.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_token.user_id)
        .bind(&new_token.token)
        .bind(&new_token.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("refresh token".to_string()))
    }

    /// Get a refresh token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<RefreshToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE id = ?");
        sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Get a token that is neither expired nor revoked.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens
             WHERE token = ? AND revoked_at IS NULL AND expires_at > datetime('now')"
        );
        sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Revoke a token. Returns false if it was unknown or already revoked.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .execute(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every live token of a user, e.g. after a password reset.
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Delete expired and revoked tokens.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens
             WHERE expires_at < datetime('now') OR revoked_at IS NOT NULL",
        )
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

    fn token(value: &str, expires_at: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id: 1,
            token: value.to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_validate() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        let created = repo
            .create(&token("live", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert_eq!(created.user_id, 1);
        assert!(created.revoked_at.is_none());

        repo.create(&token("stale", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid_token("live").await.unwrap().is_some());
        assert!(repo.get_valid_token("stale").await.unwrap().is_none());
        assert!(repo.get_valid_token("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token("live", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert!(repo.revoke("live").await.unwrap());
        assert!(!repo.revoke("live").await.unwrap());
        assert!(repo.get_valid_token("live").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_all_and_cleanup() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token("one", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token("two", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token("old", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert_eq!(repo.revoke_all_for_user(1).await.unwrap(), 3);
        assert_eq!(repo.cleanup_expired().await.unwrap(), 3);
    }
}
