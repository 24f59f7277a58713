//! Mailing module for Mailcast.
//!
//! This module provides the campaign data model:
//! - Recipients (unique email, owned by a user)
//! - Messages (subject and body template)
//! - Mailings (one message sent to a set of recipients)
//! - Attempt log written by the dispatch engine
//! - A service layer applying validation and ownership checks

mod attempt_repository;
mod message_repository;
mod recipient_repository;
mod repository;
mod service;
mod types;

pub use attempt_repository::AttemptRepository;
pub use message_repository::MessageRepository;
pub use recipient_repository::RecipientRepository;
pub use repository::MailingRepository;
pub use service::{MailingDetails, MailingForm, MailingService, MessageForm, RecipientForm};
pub use types::{
    AttemptStatus, Mailing, MailingAttempt, MailingStatus, MailingUpdate, Message, MessageUpdate,
    NewMailing, NewMailingAttempt, NewMessage, NewRecipient, Recipient, RecipientUpdate,
    MAX_FULL_NAME_LENGTH, MAX_SUBJECT_LENGTH,
};
