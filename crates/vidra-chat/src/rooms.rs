//! Room and invitation use cases.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use vidra_commons::{
    CommonError, Invitation, InvitationId, InvitationStatus, JoinMode, MemberId, Result, Room,
    RoomId, RoomType,
};
use vidra_store::{InvitationRepo, RoomRepo, StoreError};

/// Room and invitation operations.
pub struct RoomService {
    rooms: Arc<dyn RoomRepo>,
    invitations: Arc<dyn InvitationRepo>,
}

impl RoomService {
    pub fn new(rooms: Arc<dyn RoomRepo>, invitations: Arc<dyn InvitationRepo>) -> Self {
        Self { rooms, invitations }
    }

    /// Create a pending one-on-one invitation.
    ///
    /// At most one pending invitation per (inviter, invitee) ordered
    /// pair; the store's partial unique index backs this up against
    /// racing inviters.
    pub async fn invite(&self, inviter: &MemberId, invitee: &MemberId) -> Result<InvitationId> {
        if self
            .invitations
            .find_pending_by_pair(inviter, invitee)
            .await
            .map_err(internal)?
            .is_some()
        {
            return Err(CommonError::already_exists(
                "already invited, wait for acceptance",
            ));
        }

        let invitation = Invitation {
            invitation_id: InvitationId::generate(),
            inviter_id: inviter.clone(),
            invitee_id: invitee.clone(),
            status: InvitationStatus::Pending,
            created_at: Utc::now().timestamp(),
        };

        self.invitations.create(&invitation).await.map_err(|e| match e {
            StoreError::Conflict(msg) => CommonError::already_exists(msg),
            other => internal(other),
        })?;

        info!("invitation {} created: {inviter} -> {invitee}", invitation.invitation_id);
        Ok(invitation.invitation_id)
    }

    /// Accept a pending invitation addressed to `invitee`.
    ///
    /// Moves it to `accepted` and returns the pair's private room,
    /// creating it if this is the first acceptance between the two.
    pub async fn accept(&self, inviter: &MemberId, invitee: &MemberId) -> Result<RoomId> {
        let invitation = self
            .invitations
            .find_latest_by_pair(inviter, invitee)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found("invitation not found"))?;

        if &invitation.invitee_id != invitee {
            return Err(CommonError::permission_denied("not the correct invitee"));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(CommonError::invalid_input("invitation not pending"));
        }

        self.invitations
            .update_status(&invitation.invitation_id, InvitationStatus::Accepted)
            .await
            .map_err(internal)?;

        if let Some(existing) = self
            .rooms
            .find_private_room(inviter, invitee)
            .await
            .map_err(internal)?
        {
            return Ok(existing.room_id);
        }

        let room = Room {
            room_id: RoomId::generate(),
            room_type: RoomType::Private,
            name: String::new(),
            members: vec![inviter.clone(), invitee.clone()],
            admins: Vec::new(),
            join_mode: JoinMode::Open,
            password: None,
            is_private: false,
            is_invite: true,
            created_at: Utc::now().timestamp(),
        };
        self.rooms.create(&room).await.map_err(internal)?;

        info!("private room {} created for {inviter} and {invitee}", room.room_id);
        Ok(room.room_id)
    }

    /// Create a room directly (group, or private with exactly two
    /// members).
    #[allow(clippy::too_many_arguments)]
    pub async fn create_room(
        &self,
        creator: &MemberId,
        room_type: RoomType,
        name: String,
        members: Vec<MemberId>,
        join_mode: Option<JoinMode>,
        password: Option<String>,
        is_private: bool,
    ) -> Result<RoomId> {
        let mut members = members;
        if !members.iter().any(|m| m == creator) {
            members.insert(0, creator.clone());
        }

        if room_type == RoomType::Private && members.len() != 2 {
            return Err(CommonError::invalid_input(
                "private room must have exactly 2 members",
            ));
        }

        // the creator administers a group room
        let admins = match room_type {
            RoomType::Group => vec![creator.clone()],
            RoomType::Private => Vec::new(),
        };

        let room = Room {
            room_id: RoomId::generate(),
            room_type,
            name,
            members,
            admins,
            join_mode: join_mode.unwrap_or(JoinMode::Open),
            password,
            is_private,
            is_invite: false,
            created_at: Utc::now().timestamp(),
        };
        self.rooms.create(&room).await.map_err(internal)?;

        info!("room {} created by {creator}", room.room_id);
        Ok(room.room_id)
    }

    /// Join a group room honoring its join mode.
    pub async fn join_room(
        &self,
        member: &MemberId,
        room_id: &RoomId,
        password: Option<&str>,
    ) -> Result<()> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found("room not found"))?;

        if room.room_type != RoomType::Group {
            return Err(CommonError::invalid_input("not a group chat room"));
        }

        match room.join_mode {
            JoinMode::Open => {}
            JoinMode::Password => {
                let given = password.unwrap_or("");
                if given.is_empty() || Some(given) != room.password.as_deref() {
                    return Err(CommonError::permission_denied("invalid password"));
                }
            }
            JoinMode::Approve => {
                return Err(CommonError::permission_denied("need admin approval"));
            }
        }

        self.rooms.add_member(room_id, member).await.map_err(internal)
    }

    /// Leave a room's member list.
    pub async fn exit_room(&self, member: &MemberId, room_id: &RoomId) -> Result<()> {
        self.rooms
            .find_by_id(room_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found("room not found"))?;

        self.rooms.remove_member(room_id, member).await.map_err(internal)
    }

    /// All pending invitations addressed to `member`.
    pub async fn pending_invitations(&self, member: &MemberId) -> Result<Vec<Invitation>> {
        self.invitations
            .find_pending_for_invitee(member)
            .await
            .map_err(internal)
    }
}

fn internal(e: impl std::fmt::Display) -> CommonError {
    CommonError::internal(e.to_string())
}
