//! Error types for the Postgres repositories.

use thiserror::Error;

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors produced by repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint hit (duplicate email, pending invitation).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),

    /// Stored JSON did not deserialize into the domain model.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Map a sqlx error, turning unique violations into
    /// [`StoreError::Conflict`] with the given description.
    pub fn from_sqlx(e: sqlx::Error, conflict_msg: &str) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::Conflict(conflict_msg.to_string());
            }
        }
        StoreError::Database(e.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
