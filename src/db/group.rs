//! Groups and group membership.

use super::DbPool;
use crate::{MailcastError, Result};

/// Name of the privileged group whose members bypass ownership checks.
pub const MANAGERS_GROUP: &str = "managers";

/// Group entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Repository for groups and membership.
pub struct GroupRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> GroupRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a group by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Group>> {
        sqlx::query_as::<_, Group>("SELECT id, name, created_at FROM groups WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))
    }

    /// Get the named group, creating it if missing.
    ///
    /// Returns the group and whether it was created by this call.
    pub async fn get_or_create(&self, name: &str) -> Result<(Group, bool)> {
        let result = sqlx::query("INSERT OR IGNORE INTO groups (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(|e| MailcastError::Database(e.to_string()))?;
        let created = result.rows_affected() > 0;

        let group = self
            .get_by_name(name)
            .await?
            .ok_or_else(|| MailcastError::NotFound("group".to_string()))?;
        Ok((group, created))
    }

    /// Add a user to a group. Returns false if already a member.
    pub async fn add_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(group_id)
                .execute(self.pool)
                .await
                .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether a user belongs to the named group.
    pub async fn is_member(&self, user_id: i64, group_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM user_groups ug
                JOIN groups g ON g.id = ug.group_id
                WHERE ug.user_id = ? AND g.name = ?
             )",
        )
        .bind(user_id)
        .bind(group_name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Names of all groups a user belongs to, sorted.
    pub async fn names_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT g.name FROM groups g
             JOIN user_groups ug ON ug.group_id = g.id
             WHERE ug.user_id = ?
             ORDER BY g.name",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| MailcastError::Database(e.to_string()))
    }
}
