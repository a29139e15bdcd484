//! Shared error taxonomy for Vidra operations.
//!
//! Service crates carry their own `thiserror` enums for
//! infrastructure failures; `CommonError` is the vocabulary the RPC
//! layer maps onto transport status codes (see spec'd taxonomy:
//! validation, not-found, conflict, authentication, backend).

use thiserror::Error;

/// Common error type shared by the Vidra use cases.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommonError {
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found (member, room, invitation, bucket, video).
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource already exists (duplicate email, pending invitation).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Caller is not allowed to perform the action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Missing, malformed or expired credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Backend failure (store, cache, queue, object store, transport).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommonError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status the RPC layer responds with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CommonError::InvalidInput(_) => 400,
            CommonError::Unauthenticated(_) => 401,
            CommonError::PermissionDenied(_) => 403,
            CommonError::NotFound(_) => 404,
            CommonError::AlreadyExists(_) => 409,
            CommonError::Internal(_) => 500,
        }
    }
}

/// Result type alias using [`CommonError`].
pub type Result<T> = std::result::Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::not_found("room r-1");
        assert_eq!(err.to_string(), "not found: room r-1");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CommonError::invalid_input("x").status_code(), 400);
        assert_eq!(CommonError::unauthenticated("x").status_code(), 401);
        assert_eq!(CommonError::already_exists("x").status_code(), 409);
        assert_eq!(CommonError::internal("x").status_code(), 500);
    }
}
