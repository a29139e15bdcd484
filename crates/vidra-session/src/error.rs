//! Error types for the session cache.

use thiserror::Error;

/// Errors produced by KV store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Key absent (or expired, which is the same thing).
    #[error("key not found: {0}")]
    NotFound(String),

    /// Redis transport or command failure.
    #[error("redis error: {0}")]
    Redis(String),

    /// Value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for SessionError {
    fn from(e: redis::RedisError) -> Self {
        SessionError::Redis(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
