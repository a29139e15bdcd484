//! Error types for credential operations.

use thiserror::Error;

/// Errors produced by password and token operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password does not meet the strength rules.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Stored hash does not match the presented password.
    #[error("password does not match")]
    PasswordMismatch,

    /// bcrypt failure (hashing or verification).
    #[error("hashing error: {0}")]
    Hashing(String),

    /// Token is malformed, has a bad signature or bad claims.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
