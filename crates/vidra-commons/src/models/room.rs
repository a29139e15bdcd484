//! Chat rooms and private-chat invitations.

use serde::{Deserialize, Serialize};

use super::ids::{InvitationId, MemberId, RoomId};

/// Kind of chat room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// One-on-one room for an unordered member pair.
    Private,
    /// Group room with admins and a join mode.
    Group,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Private => "private",
            RoomType::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(RoomType::Private),
            "group" => Some(RoomType::Group),
            _ => None,
        }
    }
}

/// How a member may join a group room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Anyone joins unconditionally; joining twice is a no-op.
    Open,
    /// Joining requires the exact room password.
    Password,
    /// Admin approval required; refused at the protocol level.
    Approve,
}

impl JoinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMode::Open => "open",
            JoinMode::Password => "password",
            JoinMode::Approve => "approve",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(JoinMode::Open),
            "password" => Some(JoinMode::Password),
            "approve" => Some(JoinMode::Approve),
            _ => None,
        }
    }
}

/// A chat room.
///
/// Invariants: a private room has exactly two members at creation and
/// represents an order-independent pair; a group has at least one
/// admin (the creator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub room_type: RoomType,
    #[serde(default)]
    pub name: String,
    pub members: Vec<MemberId>,
    #[serde(default)]
    pub admins: Vec<MemberId>,
    pub join_mode: JoinMode,
    /// Plain join password, only meaningful with [`JoinMode::Password`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub is_private: bool,
    pub is_invite: bool,
    pub created_at: i64,
}

impl Room {
    pub fn has_member(&self, member: &MemberId) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

/// Lifecycle status of a private-chat invitation.
///
/// `pending → accepted` creates the private room if none exists;
/// `pending → rejected` is terminal. No transitions leave `accepted`
/// or `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            "rejected" => Some(InvitationStatus::Rejected),
            _ => None,
        }
    }
}

/// A one-on-one chat invitation. At most one pending invitation may
/// exist per (inviter, invitee) ordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub invitation_id: InvitationId,
    pub inviter_id: MemberId,
    pub invitee_id: MemberId,
    pub status: InvitationStatus,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trips() {
        assert_eq!(RoomType::parse("private"), Some(RoomType::Private));
        assert_eq!(JoinMode::parse("approve"), Some(JoinMode::Approve));
        assert_eq!(
            InvitationStatus::parse("accepted"),
            Some(InvitationStatus::Accepted)
        );
        assert_eq!(RoomType::parse("other"), None);
    }

    #[test]
    fn test_room_membership() {
        let a = MemberId::generate();
        let b = MemberId::generate();
        let room = Room {
            room_id: RoomId::generate(),
            room_type: RoomType::Private,
            name: String::new(),
            members: vec![a.clone(), b],
            admins: vec![],
            join_mode: JoinMode::Open,
            password: None,
            is_private: true,
            is_invite: true,
            created_at: 0,
        };
        assert!(room.has_member(&a));
        assert!(!room.has_member(&MemberId::generate()));
    }
}
