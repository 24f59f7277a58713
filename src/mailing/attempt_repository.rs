//! Mailing attempt log.

use sqlx::QueryBuilder;

use super::types::{MailingAttempt, NewMailingAttempt};
use crate::db::DbPool;
use crate::{MailcastError, Result};

const ATTEMPT_COLUMNS: &str = "a.id, a.mailing_id, a.attempt_time, a.status, a.server_response";

/// Repository for send attempts.
pub struct AttemptRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AttemptRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record one attempt. Each insert is its own statement.
    pub async fn create(&self, new: &NewMailingAttempt) -> Result<MailingAttempt> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO mailing_attempts (mailing_id, attempt_time, status, server_response)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(new.mailing_id)
        .bind(new.attempt_time)
        .bind(new.status)
        .bind(&new.server_response)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("mailing attempt".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<MailingAttempt>> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM mailing_attempts a WHERE a.id = ?");
        sqlx::query_as::<_, MailingAttempt>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Attempts of one mailing, oldest first.
    pub async fn list_for_mailing(&self, mailing_id: i64) -> Result<Vec<MailingAttempt>> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM mailing_attempts a
             WHERE a.mailing_id = ? ORDER BY a.id"
        );
        sqlx::query_as::<_, MailingAttempt>(&sql)
            .bind(mailing_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// All attempts, optionally only for mailings of one owner.
    pub async fn list(&self, owner_id: Option<i64>) -> Result<Vec<MailingAttempt>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {ATTEMPT_COLUMNS} FROM mailing_attempts a
             JOIN mailings m ON m.id = a.mailing_id"
        ));
        if let Some(owner_id) = owner_id {
            query.push(" WHERE m.owner_id = ");
            query.push_bind(owner_id);
        }
        query.push(" ORDER BY a.id");

        query
            .build_query_as::<MailingAttempt>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }
}
