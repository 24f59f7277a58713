//! API handlers.

pub mod auth;
pub mod mailing;
pub mod message;
pub mod recipient;
pub mod user;

pub use auth::*;
pub use mailing::*;
pub use message::*;
pub use recipient::*;
pub use user::*;
