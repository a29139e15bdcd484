//! The WebSocket action protocol.
//!
//! Every client frame is a JSON object tagged by its `action` field;
//! the server always replies `{action, success, payload?, error?}`.
//! Unknown actions fail to parse and are answered with
//! `{action: "error"}` — the connection stays up.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use vidra_commons::{JoinMode, MemberId, MessageId, RoomId, RoomType};

/// Client request, dispatched exhaustively.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    InvitePrivate {
        invitee_id: MemberId,
    },
    AcceptInvite {
        inviter_id: MemberId,
    },
    CreateRoom {
        room_type: RoomType,
        #[serde(default)]
        room_name: String,
        #[serde(default)]
        members: Vec<MemberId>,
        #[serde(default)]
        join_mode: Option<JoinMode>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        is_private: bool,
    },
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        password: Option<String>,
    },
    ExitRoom {
        room_id: RoomId,
    },
    EnterRoom {
        room_id: RoomId,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    SendMessage {
        room_id: RoomId,
        content: String,
    },
    ReadMessage {
        room_id: RoomId,
        message_id: MessageId,
    },
    GetUnread,
    GetInvite,
}

impl Action {
    /// Wire name echoed back in the response `action` field.
    pub fn name(&self) -> &'static str {
        match self {
            Action::InvitePrivate { .. } => "invite_private",
            Action::AcceptInvite { .. } => "accept_invite",
            Action::CreateRoom { .. } => "create_room",
            Action::JoinRoom { .. } => "join_room",
            Action::ExitRoom { .. } => "exit_room",
            Action::EnterRoom { .. } => "enter_room",
            Action::LeaveRoom { .. } => "leave_room",
            Action::SendMessage { .. } => "send_message",
            Action::ReadMessage { .. } => "read_message",
            Action::GetUnread => "get_unread",
            Action::GetInvite => "get_invite",
        }
    }
}

/// Server frame.
#[derive(Debug, Clone, Serialize)]
pub struct WsResponse {
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WsResponse {
    pub fn ok(action: &str) -> Self {
        Self {
            action: action.to_string(),
            success: true,
            payload: Map::new(),
            error: None,
        }
    }

    pub fn err(action: &str, error: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            success: false,
            payload: Map::new(),
            error: Some(error.into()),
        }
    }

    /// Reply for frames that never resolved to a known action.
    pub fn unknown_action() -> Self {
        Self::err("error", "unknown action")
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"action":"error","success":false,"error":"serialization failure"}"#.to_string()
        })
    }
}
