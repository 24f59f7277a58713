//! Error types for Mailcast.

use thiserror::Error;

/// Common error type for Mailcast.
#[derive(Error, Debug)]
pub enum MailcastError {
    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Outbound mail transport error.
    #[error("mail transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for MailcastError {
    fn from(e: sqlx::Error) -> Self {
        MailcastError::Database(e.to_string())
    }
}

impl From<crate::auth::PermissionError> for MailcastError {
    fn from(e: crate::auth::PermissionError) -> Self {
        MailcastError::Permission(e.to_string())
    }
}

/// Result type alias for Mailcast operations.
pub type Result<T> = std::result::Result<T, MailcastError>;
