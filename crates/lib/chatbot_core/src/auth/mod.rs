//! Authentication: token codec, session policy, session issuer,
//! password hashing and the credential store.
//!
//! Sessions are stateless. Everything needed to continue one travels inside
//! the signed refresh token; nothing is persisted server-side.

pub mod credentials;
pub mod issuer;
pub mod jwt;
pub mod password;
pub mod session;
pub mod users;

use thiserror::Error;

use session::SessionViolation;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad signature, malformed token, or expired. Deliberately one variant.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("Session expired: {0}")]
    SessionExpired(SessionViolation),

    #[error("Unknown or inactive user")]
    UnknownOrInactiveUser,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Username already taken")]
    DuplicateUsername,

    /// Unknown username and wrong password are indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
