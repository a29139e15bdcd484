//! Exhaustive action dispatch.
//!
//! `dispatch` is pure use-case plumbing: it never touches the socket
//! or the subscriptions, it just produces the reply frame plus an
//! optional session command (room subscribe/unsubscribe) for the
//! connection actor to apply. That split keeps the whole protocol
//! testable without a WebSocket.

use serde_json::json;

use vidra_commons::{CommonError, MemberId, RoomId};

use crate::actions::{Action, WsResponse};
use crate::messages::EnterRoomMessages;
use crate::state::ChatServices;

/// Side effect on the connection requested by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Subscribe the connection to the room topic.
    EnterRoom(RoomId),
    /// Cancel the room subscription.
    LeaveRoom,
}

/// Action-level error text. The taxonomy prefix stays server-side;
/// clients see the plain reason.
fn action_error(err: CommonError) -> String {
    match err {
        CommonError::InvalidInput(msg)
        | CommonError::NotFound(msg)
        | CommonError::AlreadyExists(msg)
        | CommonError::PermissionDenied(msg)
        | CommonError::Unauthenticated(msg)
        | CommonError::Internal(msg) => msg,
    }
}

/// Run one action for `member` and build the reply frame.
pub async fn dispatch(
    services: &ChatServices,
    member: &MemberId,
    action: Action,
) -> (WsResponse, Option<SessionCommand>) {
    let name = action.name();

    match action {
        Action::InvitePrivate { invitee_id } => {
            let result = services.rooms.invite(member, &invitee_id).await;
            (
                match result {
                    Ok(invitation_id) => {
                        WsResponse::ok(name).with("invitation_id", invitation_id.as_str())
                    }
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::AcceptInvite { inviter_id } => {
            let result = services.rooms.accept(&inviter_id, member).await;
            (
                match result {
                    Ok(room_id) => WsResponse::ok(name).with("room_id", room_id.as_str()),
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::CreateRoom {
            room_type,
            room_name,
            members,
            join_mode,
            password,
            is_private,
        } => {
            let result = services
                .rooms
                .create_room(member, room_type, room_name, members, join_mode, password, is_private)
                .await;
            (
                match result {
                    Ok(room_id) => WsResponse::ok(name).with("room_id", room_id.as_str()),
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::JoinRoom { room_id, password } => {
            let result = services
                .rooms
                .join_room(member, &room_id, password.as_deref())
                .await;
            (
                match result {
                    Ok(()) => WsResponse::ok(name),
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::ExitRoom { room_id } => {
            let result = services.rooms.exit_room(member, &room_id).await;
            (
                match result {
                    Ok(()) => WsResponse::ok(name),
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::EnterRoom { room_id } => {
            match services.messages.enter_room_messages(member, &room_id).await {
                Ok(EnterRoomMessages::Unread(bucket)) => (
                    WsResponse::ok(name).with("unread_messages", json!(bucket)),
                    Some(SessionCommand::EnterRoom(room_id)),
                ),
                Ok(EnterRoomMessages::Recent(messages)) => (
                    WsResponse::ok(name)
                        .with("unread_messages", "")
                        .with("read_messages", json!(messages)),
                    Some(SessionCommand::EnterRoom(room_id)),
                ),
                Err(e) => (WsResponse::err(name, action_error(e)), None),
            }
        }

        Action::LeaveRoom { room_id } => (
            WsResponse::ok(name).with("leave_room", room_id.as_str()),
            Some(SessionCommand::LeaveRoom),
        ),

        Action::SendMessage { room_id, content } => {
            let result = services.messages.send_message(member, &room_id, content).await;
            (
                match result {
                    Ok(message_id) => {
                        WsResponse::ok(name).with("message_id", message_id.as_str())
                    }
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::ReadMessage { room_id, message_id } => {
            let result = services.messages.mark_read(member, &room_id, &message_id).await;
            (
                match result {
                    Ok(()) => WsResponse::ok(name),
                    Err(e) => WsResponse::err(name, action_error(e)),
                },
                None,
            )
        }

        Action::GetUnread => match services.messages.unread_counts(member).await {
            Ok(counts) => {
                let mut resp = WsResponse::ok(name);
                for info in counts {
                    resp = resp.with(info.room_id.as_str(), info.unread_count);
                }
                (resp, None)
            }
            Err(e) => (WsResponse::err(name, action_error(e)), None),
        },

        Action::GetInvite => match services.rooms.pending_invitations(member).await {
            Ok(invitations) => {
                let mut resp = WsResponse::ok(name);
                for invitation in invitations {
                    resp = resp.with(invitation.inviter_id.as_str(), invitation.created_at);
                }
                (resp, None)
            }
            Err(e) => (WsResponse::err(name, action_error(e)), None),
        },
    }
}
