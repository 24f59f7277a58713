//! Mailing repository.
//!
//! Owns the `mailings` table and the mailing ↔ recipient link table.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};

use super::types::{Mailing, MailingStatus, MailingUpdate, NewMailing, Recipient};
use crate::db::DbPool;
use crate::{MailcastError, Result};

const MAILING_COLUMNS: &str =
    "id, start_time, end_time, status, message_id, owner_id, created_at";

/// Repository for mailing operations.
pub struct MailingRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MailingRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a mailing with its recipient set. New mailings are `created`.
    pub async fn create(&self, new: &NewMailing) -> Result<Mailing> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO mailings (start_time, end_time, status, message_id, owner_id)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(MailingStatus::Created)
        .bind(new.message_id)
        .bind(new.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;

        Self::replace_recipients(&mut tx, id, &new.recipient_ids).await?;

        tx.commit()
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("mailing".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Mailing>> {
        let sql = format!("SELECT {MAILING_COLUMNS} FROM mailings WHERE id = ?");
        sqlx::query_as::<_, Mailing>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Recipients currently linked to a mailing, ordered by id.
    pub async fn recipients(&self, mailing_id: i64) -> Result<Vec<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            "SELECT r.id, r.email, r.full_name, r.comment, r.owner_id, r.created_at
             FROM recipients r
             JOIN mailing_recipients mr ON mr.recipient_id = r.id
             WHERE mr.mailing_id = ?
             ORDER BY r.id",
        )
        .bind(mailing_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Ids of the recipients linked to a mailing.
    pub async fn recipient_ids(&self, mailing_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar(
            "SELECT recipient_id FROM mailing_recipients WHERE mailing_id = ? ORDER BY recipient_id",
        )
        .bind(mailing_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Apply user edits. Returns None if the mailing does not exist.
    pub async fn update(&self, id: i64, update: &MailingUpdate) -> Result<Option<Mailing>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM mailings WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        if update.message_id.is_some() || update.start_time.is_some() || update.end_time.is_some()
        {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE mailings SET ");
            let mut separated = query.separated(", ");

            if let Some(message_id) = update.message_id {
                separated.push("message_id = ");
                separated.push_bind_unseparated(message_id);
            }
            if let Some(start_time) = update.start_time {
                separated.push("start_time = ");
                separated.push_bind_unseparated(start_time);
            }
            if let Some(end_time) = update.end_time {
                separated.push("end_time = ");
                separated.push_bind_unseparated(end_time);
            }

            query.push(" WHERE id = ");
            query.push_bind(id);

            query
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| MailcastError::Database(e.to_string()))?;
        }

        if let Some(ref recipient_ids) = update.recipient_ids {
            Self::replace_recipients(&mut tx, id, recipient_ids).await?;
        }

        tx.commit()
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id).await
    }

    /// Persist lifecycle fields written by the dispatch engine.
    pub async fn set_lifecycle(
        &self,
        id: i64,
        status: MailingStatus,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE mailings SET status = ?, start_time = ?, end_time = ? WHERE id = ?")
                .bind(status)
                .bind(start_time)
                .bind(end_time)
                .bind(id)
                .execute(self.pool)
                .await
                .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a mailing and its attempts.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mailings WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// List mailings, optionally restricted to one owner.
    pub async fn list(&self, owner_id: Option<i64>) -> Result<Vec<Mailing>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {MAILING_COLUMNS} FROM mailings"));
        if let Some(owner_id) = owner_id {
            query.push(" WHERE owner_id = ");
            query.push_bind(owner_id);
        }
        query.push(" ORDER BY id");

        query
            .build_query_as::<Mailing>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Mailings eligible for unattended dispatch at `now`: `started`, with
    /// a start time that has been reached (or none at all).
    pub async fn list_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Mailing>> {
        let sql = format!(
            "SELECT {MAILING_COLUMNS} FROM mailings
             WHERE status = ? AND (start_time IS NULL OR start_time <= ?)
             ORDER BY id"
        );
        sqlx::query_as::<_, Mailing>(&sql)
            .bind(MailingStatus::Started)
            .bind(now)
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    async fn replace_recipients(
        tx: &mut Transaction<'_, Sqlite>,
        mailing_id: i64,
        recipient_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM mailing_recipients WHERE mailing_id = ?")
            .bind(mailing_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;

        for recipient_id in recipient_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO mailing_recipients (mailing_id, recipient_id) VALUES (?, ?)",
            )
            .bind(mailing_id)
            .bind(recipient_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        }
        Ok(())
    }
}
