//! Member identity and session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MemberId;

/// Lifecycle status of a member account.
///
/// `Offline`/`Online` flip on logout/login; `Banned` and `Deleted`
/// are set by admin tooling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Offline,
    Online,
    Banned,
    Deleted,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Offline => "offline",
            MemberStatus::Online => "online",
            MemberStatus::Banned => "banned",
            MemberStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "offline" => Some(MemberStatus::Offline),
            "online" => Some(MemberStatus::Online),
            "banned" => Some(MemberStatus::Banned),
            "deleted" => Some(MemberStatus::Deleted),
            _ => None,
        }
    }
}

/// A registered member.
///
/// `numeric_id` is the credential store's internal key and never
/// leaves the member service; every other service speaks `member_id`
/// (the external UUID). Email is stored as entered and matched
/// case-sensitively; uniqueness is a store invariant. The struct is
/// deliberately not serializable — profiles cross process boundaries
/// as `rpc::MemberProfile`, which has no hash field.
#[derive(Debug, Clone)]
pub struct Member {
    pub numeric_id: i64,
    pub member_id: MemberId,
    pub email: String,
    /// bcrypt hash, never the plain password.
    pub password_hash: String,
    pub status: MemberStatus,
}

/// Live-session record held in the session cache.
///
/// A session exists iff the cache holds this record under the
/// member's external id with a remaining TTL > 0. The token's own
/// `exp` claim is advisory; cache TTL is authoritative, and
/// `reconnect` extends only the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub member_id: MemberId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the recorded expiry has passed. Only informational —
    /// liveness is decided by the cache TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
