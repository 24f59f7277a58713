//! Recipient repository.

use sqlx::QueryBuilder;

use super::types::{NewRecipient, Recipient, RecipientUpdate};
use crate::db::DbPool;
use crate::{MailcastError, Result};

const RECIPIENT_COLUMNS: &str = "id, email, full_name, comment, owner_id, created_at";

/// Repository for recipient CRUD operations.
pub struct RecipientRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RecipientRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a recipient.
    pub async fn create(&self, new: &NewRecipient) -> Result<Recipient> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO recipients (email, full_name, comment, owner_id)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.comment)
        .bind(new.owner_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("recipient".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Recipient>> {
        let sql = format!("SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE id = ?");
        sqlx::query_as::<_, Recipient>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Whether `email` is used by any recipient other than `exclude_id`.
    pub async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM recipients WHERE email = ? AND id != COALESCE(?, -1))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Update a recipient. Returns None if not found.
    pub async fn update(&self, id: i64, update: &RecipientUpdate) -> Result<Option<Recipient>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE recipients SET ");
        let mut separated = query.separated(", ");

        if let Some(ref email) = update.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email.clone());
        }
        if let Some(ref full_name) = update.full_name {
            separated.push("full_name = ");
            separated.push_bind_unseparated(full_name.clone());
        }
        if let Some(ref comment) = update.comment {
            separated.push("comment = ");
            separated.push_bind_unseparated(comment.clone());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Delete a recipient. It is also removed from every mailing.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipients WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// List recipients, optionally restricted to one owner.
    pub async fn list(&self, owner_id: Option<i64>) -> Result<Vec<Recipient>> {
        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {RECIPIENT_COLUMNS} FROM recipients"));
        if let Some(owner_id) = owner_id {
            query.push(" WHERE owner_id = ");
            query.push_bind(owner_id);
        }
        query.push(" ORDER BY id");

        query
            .build_query_as::<Recipient>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Number of distinct ids in `ids` that exist and belong to `owner_id`.
    pub async fn count_owned(&self, owner_id: i64, ids: &[i64]) -> Result<i64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM recipients WHERE owner_id = ");
        query.push_bind(owner_id);
        query.push(" AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        users.create(&NewUser::new("owner", "hash")).await.unwrap();
        users.create(&NewUser::new("other", "hash")).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = RecipientRepository::new(db.pool());

        let recipient = repo
            .create(&NewRecipient::new("a@x.com", "Анна", 1).with_comment("VIP"))
            .await
            .unwrap();

        assert_eq!(recipient.email, "a@x.com");
        assert_eq!(recipient.full_name, "Анна");
        assert_eq!(recipient.comment, "VIP");
        assert_eq!(recipient.owner_id, 1);
        assert_eq!(repo.get_by_id(recipient.id).await.unwrap(), Some(recipient));
    }

    #[tokio::test]
    async fn test_email_unique() {
        let db = setup().await;
        let repo = RecipientRepository::new(db.pool());
        let a = repo
            .create(&NewRecipient::new("a@x.com", "A", 1))
            .await
            .unwrap();

        assert!(repo.email_taken("a@x.com", None).await.unwrap());
        assert!(!repo.email_taken("a@x.com", Some(a.id)).await.unwrap());
        assert!(!repo.email_taken("b@x.com", None).await.unwrap());

        let duplicate = repo.create(&NewRecipient::new("a@x.com", "A2", 2)).await;
        assert!(matches!(duplicate, Err(MailcastError::Database(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = setup().await;
        let repo = RecipientRepository::new(db.pool());
        let a = repo
            .create(&NewRecipient::new("a@x.com", "A", 1))
            .await
            .unwrap();

        let updated = repo
            .update(a.id, &RecipientUpdate::new().full_name("Alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name, "Alice");
        assert_eq!(updated.email, "a@x.com");

        assert!(repo
            .update(999, &RecipientUpdate::new().comment("x"))
            .await
            .unwrap()
            .is_none());

        assert!(repo.delete(a.id).await.unwrap());
        assert!(repo.get_by_id(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count_owned() {
        let db = setup().await;
        let repo = RecipientRepository::new(db.pool());
        let a = repo
            .create(&NewRecipient::new("a@x.com", "A", 1))
            .await
            .unwrap();
        let b = repo
            .create(&NewRecipient::new("b@x.com", "B", 1))
            .await
            .unwrap();
        let c = repo
            .create(&NewRecipient::new("c@x.com", "C", 2))
            .await
            .unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 3);
        assert_eq!(repo.list(Some(1)).await.unwrap().len(), 2);
        assert_eq!(repo.list(Some(2)).await.unwrap(), vec![c.clone()]);

        assert_eq!(repo.count_owned(1, &[a.id, b.id]).await.unwrap(), 2);
        assert_eq!(repo.count_owned(1, &[a.id, c.id]).await.unwrap(), 1);
        assert_eq!(repo.count_owned(1, &[]).await.unwrap(), 0);
    }
}
