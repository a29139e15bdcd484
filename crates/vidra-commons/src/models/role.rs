//! Member roles carried in signed tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role claimed by a token. Regular sign-ups receive [`Role::Member`];
/// the admin role gates the force-logout tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Member,
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
            Role::Member => write!(f, "member"),
            Role::Guest => write!(f, "guest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_round_trip() {
        let json = serde_json::to_string(&Role::Member).unwrap();
        assert_eq!(json, "\"member\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Member);
    }
}
