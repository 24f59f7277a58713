//! Accounts and access control.
//!
//! Password hashing, registration, password reset and the ownership
//! predicate shared by every mailing operation.

mod password;
mod password_reset;
pub mod permission;
mod registration;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use password_reset::{extract_reset_code, PasswordReset, RESET_SUBJECT};
pub use permission::{
    can_access, is_owner, require_access, require_owner, require_owner_to_finish, Actor,
    PermissionError,
};
pub use registration::{register, RegistrationError, RegistrationRequest};
pub use validation::ValidationError;
