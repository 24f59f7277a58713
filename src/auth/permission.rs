//! Ownership-based access control.
//!
//! Every recipient, message and mailing has an owner. Members of the
//! `managers` group may view and manage everybody's objects; launching and
//! finishing a mailing stays with its owner.

use thiserror::Error;

use crate::db::{DbPool, GroupRepository, MANAGERS_GROUP};
use crate::Result;

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Actor is neither the owner nor a manager.
    #[error("У вас нет доступа к этому объекту.")]
    NoAccess,

    /// Only the owner may launch a mailing.
    #[error("У вас нет прав для запуска этой рассылки.")]
    NotOwner,

    /// Only the owner may finish a mailing.
    #[error("У вас нет прав для завершения этой рассылки.")]
    NotOwnerFinish,

    #[error("Учётная запись отключена.")]
    AccountInactive,
}

/// The acting user as seen by access checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    /// Member of the privileged group.
    pub is_manager: bool,
}

impl Actor {
    /// A regular user.
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            is_manager: false,
        }
    }

    /// A member of the privileged group.
    pub fn manager(user_id: i64) -> Self {
        Self {
            user_id,
            is_manager: true,
        }
    }

    /// Resolve group membership for a user.
    pub async fn load(pool: &DbPool, user_id: i64) -> Result<Self> {
        let is_manager = GroupRepository::new(pool)
            .is_member(user_id, MANAGERS_GROUP)
            .await?;
        Ok(Self {
            user_id,
            is_manager,
        })
    }
}

/// Whether the actor owns the object.
pub fn is_owner(actor: &Actor, owner_id: i64) -> bool {
    actor.user_id == owner_id
}

/// Whether the actor may view, edit or delete an object.
///
/// ```
/// use mailcast::auth::{can_access, Actor};
///
/// assert!(can_access(&Actor::user(1), 1));
/// assert!(!can_access(&Actor::user(2), 1));
/// assert!(can_access(&Actor::manager(2), 1));
/// ```
pub fn can_access(actor: &Actor, owner_id: i64) -> bool {
    actor.is_manager || is_owner(actor, owner_id)
}

/// [`can_access`] as a `Result`.
pub fn require_access(actor: &Actor, owner_id: i64) -> std::result::Result<(), PermissionError> {
    if can_access(actor, owner_id) {
        Ok(())
    } else {
        Err(PermissionError::NoAccess)
    }
}

/// Strict ownership check used before launching a mailing.
pub fn require_owner(actor: &Actor, owner_id: i64) -> std::result::Result<(), PermissionError> {
    if is_owner(actor, owner_id) {
        Ok(())
    } else {
        Err(PermissionError::NotOwner)
    }
}

/// Strict ownership check used before finishing a mailing.
pub fn require_owner_to_finish(
    actor: &Actor,
    owner_id: i64,
) -> std::result::Result<(), PermissionError> {
    if is_owner(actor, owner_id) {
        Ok(())
    } else {
        Err(PermissionError::NotOwnerFinish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    #[test]
    fn test_owner_has_access() {
        let actor = Actor::user(1);
        assert!(is_owner(&actor, 1));
        assert!(can_access(&actor, 1));
        assert!(require_access(&actor, 1).is_ok());
        assert!(require_owner(&actor, 1).is_ok());
    }

    #[test]
    fn test_stranger_has_no_access() {
        let actor = Actor::user(2);
        assert!(!can_access(&actor, 1));
        assert_eq!(require_access(&actor, 1), Err(PermissionError::NoAccess));
        assert_eq!(require_owner(&actor, 1), Err(PermissionError::NotOwner));
    }

    #[test]
    fn test_manager_has_access_but_is_not_owner() {
        let actor = Actor::manager(2);
        assert!(can_access(&actor, 1));
        assert!(!is_owner(&actor, 1));
        assert_eq!(require_owner(&actor, 1), Err(PermissionError::NotOwner));
        assert_eq!(
            require_owner_to_finish(&actor, 1),
            Err(PermissionError::NotOwnerFinish)
        );
        assert!(require_owner_to_finish(&Actor::manager(1), 1).is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PermissionError::NoAccess.to_string(),
            "У вас нет доступа к этому объекту."
        );
        assert_eq!(
            PermissionError::NotOwner.to_string(),
            "У вас нет прав для запуска этой рассылки."
        );
    }

    #[tokio::test]
    async fn test_load_actor() {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("manager", "hash"))
            .await
            .unwrap();

        let actor = Actor::load(db.pool(), user.id).await.unwrap();
        assert_eq!(actor, Actor::user(user.id));

        let groups = GroupRepository::new(db.pool());
        let (group, _) = groups.get_or_create(MANAGERS_GROUP).await.unwrap();
        groups.add_member(group.id, user.id).await.unwrap();

        let actor = Actor::load(db.pool(), user.id).await.unwrap();
        assert_eq!(actor, Actor::manager(user.id));
    }
}
