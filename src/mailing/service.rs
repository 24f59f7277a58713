//! Mailing service: validated operations on recipients, messages and
//! mailings, evaluated for a given actor.

use chrono::{DateTime, Utc};
use tracing::info;

use super::attempt_repository::AttemptRepository;
use super::message_repository::MessageRepository;
use super::recipient_repository::RecipientRepository;
use super::repository::MailingRepository;
use super::types::{
    Mailing, MailingAttempt, MailingUpdate, Message, MessageUpdate, NewMailing, NewMessage,
    NewRecipient, Recipient, RecipientUpdate, MAX_FULL_NAME_LENGTH, MAX_SUBJECT_LENGTH,
};
use crate::auth::permission::{require_access, Actor};
use crate::auth::validation::validate_email;
use crate::db::Database;
use crate::{MailcastError, Result};

/// Input for creating or replacing a recipient.
#[derive(Debug, Clone, Default)]
pub struct RecipientForm {
    pub email: String,
    pub full_name: String,
    pub comment: String,
}

/// Input for creating or replacing a message.
#[derive(Debug, Clone, Default)]
pub struct MessageForm {
    pub subject: String,
    pub body: String,
}

/// Input for creating or replacing a mailing. There is no status field.
#[derive(Debug, Clone, Default)]
pub struct MailingForm {
    pub message_id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub recipient_ids: Vec<i64>,
}

/// A mailing with its message and recipients.
#[derive(Debug, Clone)]
pub struct MailingDetails {
    pub mailing: Mailing,
    pub message: Message,
    pub recipients: Vec<Recipient>,
}

/// Normalize and validate a recipient email.
fn clean_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(MailcastError::Validation(
            "Укажите email получателя.".to_string(),
        ));
    }
    validate_email(&email).map_err(|_| {
        MailcastError::Validation("Введите правильный адрес электронной почты.".to_string())
    })?;
    Ok(email)
}

fn validate_full_name(full_name: &str) -> Result<()> {
    if full_name.trim().is_empty() {
        return Err(MailcastError::Validation("Укажите Ф.И.О. получателя.".to_string()));
    }
    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(MailcastError::Validation(format!(
            "Ф.И.О. не должно превышать {} символов.",
            MAX_FULL_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_subject(subject: &str) -> Result<()> {
    if subject.trim().is_empty() {
        return Err(MailcastError::Validation("Укажите тему письма.".to_string()));
    }
    if subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(MailcastError::Validation(format!(
            "Длина темы не должна превышать {} символов.",
            MAX_SUBJECT_LENGTH
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(MailcastError::Validation("Укажите текст письма.".to_string()));
    }
    Ok(())
}

fn validate_schedule(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(MailcastError::Validation(
                "Дата и время начала рассылки должны быть меньше или равны дате и времени окончания."
                    .to_string(),
            ));
        }
    }
    Ok(())
}

/// Owner filter for list operations.
fn list_scope(actor: &Actor) -> Option<i64> {
    if actor.is_manager {
        None
    } else {
        Some(actor.user_id)
    }
}

/// Service for mailing-related operations.
pub struct MailingService<'a> {
    db: &'a Database,
}

impl<'a> MailingService<'a> {
    /// Create a new MailingService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // ---- recipients ----

    pub async fn list_recipients(&self, actor: &Actor) -> Result<Vec<Recipient>> {
        RecipientRepository::new(self.db.pool())
            .list(list_scope(actor))
            .await
    }

    pub async fn get_recipient(&self, actor: &Actor, id: i64) -> Result<Recipient> {
        let recipient = RecipientRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("recipient".to_string()))?;
        require_access(actor, recipient.owner_id)?;
        Ok(recipient)
    }

    pub async fn create_recipient(&self, actor: &Actor, form: &RecipientForm) -> Result<Recipient> {
        let repo = RecipientRepository::new(self.db.pool());
        let email = self.clean_recipient(&repo, form, None).await?;

        let new = NewRecipient::new(email, form.full_name.trim(), actor.user_id)
            .with_comment(form.comment.trim());
        let recipient = repo.create(&new).await?;
        info!(recipient_id = recipient.id, owner_id = actor.user_id, "recipient created");
        Ok(recipient)
    }

    pub async fn update_recipient(
        &self,
        actor: &Actor,
        id: i64,
        form: &RecipientForm,
    ) -> Result<Recipient> {
        self.get_recipient(actor, id).await?;

        let repo = RecipientRepository::new(self.db.pool());
        let email = self.clean_recipient(&repo, form, Some(id)).await?;

        let update = RecipientUpdate::new()
            .email(email)
            .full_name(form.full_name.trim())
            .comment(form.comment.trim());
        repo.update(id, &update)
            .await?
            .ok_or_else(|| MailcastError::NotFound("recipient".to_string()))
    }

    pub async fn delete_recipient(&self, actor: &Actor, id: i64) -> Result<()> {
        self.get_recipient(actor, id).await?;
        RecipientRepository::new(self.db.pool()).delete(id).await?;
        info!(recipient_id = id, "recipient deleted");
        Ok(())
    }

    async fn clean_recipient(
        &self,
        repo: &RecipientRepository<'_>,
        form: &RecipientForm,
        exclude_id: Option<i64>,
    ) -> Result<String> {
        let email = clean_email(&form.email)?;
        if repo.email_taken(&email, exclude_id).await? {
            return Err(MailcastError::Validation(
                "Пользователь с таким email уже существует.".to_string(),
            ));
        }
        validate_full_name(&form.full_name)?;
        Ok(email)
    }

    // ---- messages ----

    pub async fn list_messages(&self, actor: &Actor) -> Result<Vec<Message>> {
        MessageRepository::new(self.db.pool())
            .list(list_scope(actor))
            .await
    }

    pub async fn get_message(&self, actor: &Actor, id: i64) -> Result<Message> {
        let message = MessageRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("message".to_string()))?;
        require_access(actor, message.owner_id)?;
        Ok(message)
    }

    pub async fn create_message(&self, actor: &Actor, form: &MessageForm) -> Result<Message> {
        validate_subject(&form.subject)?;
        validate_body(&form.body)?;

        let message = MessageRepository::new(self.db.pool())
            .create(&NewMessage::new(
                form.subject.trim(),
                form.body.as_str(),
                actor.user_id,
            ))
            .await?;
        info!(message_id = message.id, owner_id = actor.user_id, "message created");
        Ok(message)
    }

    pub async fn update_message(&self, actor: &Actor, id: i64, form: &MessageForm) -> Result<Message> {
        self.get_message(actor, id).await?;
        validate_subject(&form.subject)?;
        validate_body(&form.body)?;

        let update = MessageUpdate::new()
            .subject(form.subject.trim())
            .body(form.body.as_str());
        MessageRepository::new(self.db.pool())
            .update(id, &update)
            .await?
            .ok_or_else(|| MailcastError::NotFound("message".to_string()))
    }

    /// Delete a message. Mailings that use it are deleted too.
    pub async fn delete_message(&self, actor: &Actor, id: i64) -> Result<()> {
        self.get_message(actor, id).await?;
        MessageRepository::new(self.db.pool()).delete(id).await?;
        info!(message_id = id, "message deleted");
        Ok(())
    }

    // ---- mailings ----

    pub async fn list_mailings(&self, actor: &Actor) -> Result<Vec<Mailing>> {
        MailingRepository::new(self.db.pool())
            .list(list_scope(actor))
            .await
    }

    pub async fn get_mailing(&self, actor: &Actor, id: i64) -> Result<Mailing> {
        let mailing = MailingRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("mailing".to_string()))?;
        require_access(actor, mailing.owner_id)?;
        Ok(mailing)
    }

    /// Mailing with its message and recipients.
    pub async fn get_mailing_details(&self, actor: &Actor, id: i64) -> Result<MailingDetails> {
        let mailing = self.get_mailing(actor, id).await?;
        let message = MessageRepository::new(self.db.pool())
            .get_by_id(mailing.message_id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("message".to_string()))?;
        let recipients = MailingRepository::new(self.db.pool())
            .recipients(mailing.id)
            .await?;
        Ok(MailingDetails {
            mailing,
            message,
            recipients,
        })
    }

    pub async fn create_mailing(&self, actor: &Actor, form: &MailingForm) -> Result<Mailing> {
        let recipient_ids = self.clean_mailing(actor, form).await?;

        let mut new = NewMailing::new(form.message_id, actor.user_id).with_recipients(recipient_ids);
        new.start_time = form.start_time;
        new.end_time = form.end_time;

        let mailing = MailingRepository::new(self.db.pool()).create(&new).await?;
        info!(
            mailing_id = mailing.id,
            owner_id = actor.user_id,
            recipients = new.recipient_ids.len(),
            "mailing created"
        );
        Ok(mailing)
    }

    /// Replace the editable fields of a mailing. Status is left alone.
    pub async fn update_mailing(&self, actor: &Actor, id: i64, form: &MailingForm) -> Result<Mailing> {
        self.get_mailing(actor, id).await?;
        let recipient_ids = self.clean_mailing(actor, form).await?;

        let update = MailingUpdate::new()
            .message_id(form.message_id)
            .start_time(form.start_time)
            .end_time(form.end_time)
            .recipients(recipient_ids);
        MailingRepository::new(self.db.pool())
            .update(id, &update)
            .await?
            .ok_or_else(|| MailcastError::NotFound("mailing".to_string()))
    }

    pub async fn delete_mailing(&self, actor: &Actor, id: i64) -> Result<()> {
        self.get_mailing(actor, id).await?;
        MailingRepository::new(self.db.pool()).delete(id).await?;
        info!(mailing_id = id, "mailing deleted");
        Ok(())
    }

    /// Validate a mailing form and return the deduplicated recipient ids.
    async fn clean_mailing(&self, actor: &Actor, form: &MailingForm) -> Result<Vec<i64>> {
        self.get_message(actor, form.message_id).await?;
        validate_schedule(form.start_time, form.end_time)?;

        let mut ids = form.recipient_ids.clone();
        ids.sort_unstable();
        ids.dedup();

        let owned = RecipientRepository::new(self.db.pool())
            .count_owned(actor.user_id, &ids)
            .await?;
        if owned != ids.len() as i64 {
            return Err(MailcastError::Validation(
                "Можно выбрать только своих получателей.".to_string(),
            ));
        }
        Ok(ids)
    }

    // ---- attempts ----

    /// Attempt log visible to the actor.
    pub async fn list_attempts(&self, actor: &Actor) -> Result<Vec<MailingAttempt>> {
        AttemptRepository::new(self.db.pool())
            .list(list_scope(actor))
            .await
    }

    pub async fn mailing_attempts(&self, actor: &Actor, mailing_id: i64) -> Result<Vec<MailingAttempt>> {
        self.get_mailing(actor, mailing_id).await?;
        AttemptRepository::new(self.db.pool())
            .list_for_mailing(mailing_id)
            .await
    }
}
