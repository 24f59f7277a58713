//! Mailcast - bulk email campaigns.
//!
//! Users manage recipients and messages, group them into mailings and send
//! them either on demand through the HTTP API or on a schedule through the
//! `send-mailings` command. Every send is recorded as an attempt.
//!
//! ```
//! use mailcast::auth::{can_access, Actor};
//!
//! let hash = mailcast::hash_password("correct horse").unwrap();
//! assert!(mailcast::verify_password("correct horse", &hash).is_ok());
//!
//! assert!(can_access(&Actor::manager(2), 1));
//! assert!(!can_access(&Actor::user(2), 1));
//! ```

pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod mailing;
pub mod transport;
pub mod web;

pub use auth::{
    can_access, hash_password, register, validate_password, verify_password, Actor,
    PasswordError, PermissionError, RegistrationError, RegistrationRequest,
};
pub use config::Config;
pub use db::{Database, GroupRepository, NewUser, User, UserRepository, MANAGERS_GROUP};
pub use dispatch::{Clock, DispatchEngine, DispatchSummary, FixedClock, SystemClock};
pub use error::{MailcastError, Result};
pub use mailing::{Mailing, MailingService, MailingStatus, Message, Recipient};
pub use transport::{build_mailer, Mailer, MemoryMailer, OutgoingEmail, TransportError};
pub use web::WebServer;
