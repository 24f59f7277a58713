//! Message repository.

use sqlx::QueryBuilder;

use super::types::{Message, MessageUpdate, NewMessage};
use crate::db::DbPool;
use crate::{MailcastError, Result};

const MESSAGE_COLUMNS: &str = "id, subject, body, owner_id, created_at";

/// Repository for message CRUD operations.
pub struct MessageRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewMessage) -> Result<Message> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO messages (subject, body, owner_id) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&new.subject)
        .bind(&new.body)
        .bind(new.owner_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("message".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    pub async fn update(&self, id: i64, update: &MessageUpdate) -> Result<Option<Message>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE messages SET ");
        let mut separated = query.separated(", ");

        if let Some(ref subject) = update.subject {
            separated.push("subject = ");
            separated.push_bind_unseparated(subject.clone());
        }
        if let Some(ref body) = update.body {
            separated.push("body = ");
            separated.push_bind_unseparated(body.clone());
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

    /// Delete a message together with the mailings that use it.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// List messages, optionally restricted to one owner.
    pub async fn list(&self, owner_id: Option<i64>) -> Result<Vec<Message>> {
        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {MESSAGE_COLUMNS} FROM messages"));
        if let Some(owner_id) = owner_id {
            query.push(" WHERE owner_id = ");
            query.push_bind(owner_id);
        }
        query.push(" ORDER BY id");

        query
            .build_query_as::<Message>()
            .fetch_all(self.pool)
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
    async fn test_crud() {
        let db = setup().await;
        let repo = MessageRepository::new(db.pool());

        let message = repo
            .create(&NewMessage::new("Hi", "Hello there", 1))
            .await
            .unwrap();
        assert_eq!(message.subject, "Hi");
        assert_eq!(message.body, "Hello there");

        let updated = repo
            .update(message.id, &MessageUpdate::new().subject("Привет"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.subject, "Привет");
        assert_eq!(updated.body, "Hello there");

        assert!(repo.delete(message.id).await.unwrap());
        assert!(repo.get_by_id(message.id).await.unwrap().is_none());
        assert!(!repo.delete(message.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let db = setup().await;
        let repo = MessageRepository::new(db.pool());
        repo.create(&NewMessage::new("One", "1", 1)).await.unwrap();
        repo.create(&NewMessage::new("Two", "2", 2)).await.unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 2);
        let own = repo.list(Some(2)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].subject, "Two");
    }
}
