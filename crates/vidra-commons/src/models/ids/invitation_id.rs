//! Type-safe wrapper for private-chat invitation identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::member_id::{validate_id, IdValidationError};

/// Identifier of a private-chat invitation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationId(String);

impl InvitationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn try_new(id: impl Into<String>) -> Result<Self, IdValidationError> {
        let id = id.into();
        validate_id("invitation id", &id)?;
        Ok(Self(id))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for InvitationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
