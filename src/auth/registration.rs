//! User registration.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{NewUser, User, UserRepository};

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("username already exists")]
    UsernameExists,

    #[error("email already registered")]
    EmailExists,

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("database error: {0}")]
    Database(String),
}

impl From<crate::MailcastError> for RegistrationError {
    fn from(e: crate::MailcastError) -> Self {
        RegistrationError::Database(e.to_string())
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username (4-32 alphanumeric + underscore).
    pub username: String,
    /// Password (8-128 characters).
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
            phone: None,
            country: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the country.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Register a new user.
///
/// Validates the fields, rejects a taken username or email, hashes the
/// password and stores the account.
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> Result<User, RegistrationError> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase);

    validate_registration(&request.username, &request.password, email.as_deref())?;

    if repo.username_exists(&request.username).await? {
        return Err(RegistrationError::UsernameExists);
    }
    if let Some(ref email) = email {
        if repo.get_by_email(email).await?.is_some() {
            return Err(RegistrationError::EmailExists);
        }
    }

    let password_hash = hash_password(&request.password)?;

    let mut new_user = NewUser::new(&request.username, password_hash);
    if let Some(email) = email {
        new_user = new_user.with_email(email);
    }
    if let Some(phone) = request.phone.filter(|p| !p.is_empty()) {
        new_user = new_user.with_phone(phone);
    }
    if let Some(country) = request.country.filter(|c| !c.is_empty()) {
        new_user = new_user.with_country(country);
    }

    let user = repo.create(&new_user).await?;

    info!(
        username = %user.username,
        user_id = user.id,
        "New user registered"
    );

    Ok(user)
}
