//! Type-safe wrapper for member external identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type-safe wrapper for a member's external identifier.
///
/// This is the opaque UUID all services use to refer to a member; the
/// numeric key of the credential store never leaves it. Member ids are
/// embedded in pub/sub topic names and session-cache keys, so the
/// wrapper rejects separator and traversal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

/// Error type for id validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdValidationError(pub String);

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IdValidationError {}

impl MemberId {
    /// Generates a fresh random member id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a MemberId from a string.
    ///
    /// # Panics
    /// Panics if the id contains separator or traversal characters.
    /// Use `try_new()` for fallible creation.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self::try_new(id).expect("MemberId contains invalid characters")
    }

    /// Creates a MemberId, returning an error if validation fails.
    pub fn try_new(id: impl Into<String>) -> Result<Self, IdValidationError> {
        let id = id.into();
        validate_id("member id", &id)?;
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner String.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Shared validation for string ids used in keys and topic names.
pub(crate) fn validate_id(what: &str, id: &str) -> Result<(), IdValidationError> {
    if id.is_empty() {
        return Err(IdValidationError(format!("{what} cannot be empty")));
    }
    if id.contains("..") {
        return Err(IdValidationError(format!(
            "{what} cannot contain '..' (path traversal)"
        )));
    }
    for bad in ['/', '\\', '\0', ':', ' '] {
        if id.contains(bad) {
            return Err(IdValidationError(format!(
                "{what} cannot contain {bad:?}"
            )));
        }
    }
    Ok(())
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MemberId {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl TryFrom<&str> for MemberId {
    type Error = IdValidationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_new(s.to_string())
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_valid_uuid() {
        let id = MemberId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        assert!(MemberId::try_new("../etc").is_err());
        assert!(MemberId::try_new("a/b").is_err());
        assert!(MemberId::try_new("a:b").is_err());
        assert!(MemberId::try_new("").is_err());
        assert!(MemberId::try_new("4be0643f-1d98-573b-97cd-ca98a65347dd").is_ok());
    }
}
