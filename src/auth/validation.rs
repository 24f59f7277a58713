//! Input validation for account fields.

use thiserror::Error;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 4;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum phone number length.
pub const MAX_PHONE_LENGTH: usize = 35;

/// Maximum country name length.
pub const MAX_COUNTRY_LENGTH: usize = 50;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    #[error("username can only contain alphanumeric characters and underscores")]
    UsernameInvalidChars,

    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    #[error("password cannot be the same as username")]
    PasswordSameAsUsername,

    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    #[error("invalid email format")]
    EmailInvalidFormat,

    #[error("phone must be at most {MAX_PHONE_LENGTH} characters")]
    PhoneTooLong,

    #[error("phone can only contain digits, spaces and + ( ) -")]
    PhoneInvalidChars,

    #[error("country must be at most {MAX_COUNTRY_LENGTH} characters")]
    CountryTooLong,
}

/// Validate a username: 4-32 ASCII alphanumeric characters or underscores.
///
/// ```
/// use mailcast::auth::validation::validate_username;
///
/// assert!(validate_username("john_doe").is_ok());
/// assert!(validate_username("ab").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Validate a password for registration or reset.
pub fn validate_registration_password(
    password: &str,
    username: Option<&str>,
) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    if let Some(user) = username {
        if password.eq_ignore_ascii_case(user) {
            return Err(ValidationError::PasswordSameAsUsername);
        }
    }
    Ok(())
}

/// Validate an email address.
///
/// Deliberately loose: one `@`, a non-empty local part, a dotted domain
/// and no whitespace.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or(ValidationError::EmailInvalidFormat)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ValidationError::EmailInvalidFormat);
    }
    if domain.split('.').any(str::is_empty) {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(())
}

/// Validate a phone number.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.chars().count() > MAX_PHONE_LENGTH {
        return Err(ValidationError::PhoneTooLong);
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '(' | ')' | '-'))
    {
        return Err(ValidationError::PhoneInvalidChars);
    }
    Ok(())
}

/// Validate a country name.
pub fn validate_country(country: &str) -> Result<(), ValidationError> {
    if country.chars().count() > MAX_COUNTRY_LENGTH {
        return Err(ValidationError::CountryTooLong);
    }
    Ok(())
}

/// Validate all registration fields, returning the first error.
pub fn validate_registration(
    username: &str,
    password: &str,
    email: Option<&str>,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_registration_password(password, Some(username))?;
    if let Some(email) = email {
        validate_email(email)?;
    }
    Ok(())
}
