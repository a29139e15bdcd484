//! Error types for the message broker.

use thiserror::Error;

/// Errors produced by pub/sub and queue operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Redis transport or command failure.
    #[error("redis error: {0}")]
    Redis(String),

    /// Payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A queue entry arrived without the expected payload field.
    #[error("malformed queue entry {0}")]
    MalformedEntry(String),
}

impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        BrokerError::Redis(e.to_string())
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(e: serde_json::Error) -> Self {
        BrokerError::Serialization(e.to_string())
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
