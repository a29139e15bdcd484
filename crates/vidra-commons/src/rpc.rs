//! Request/response DTOs for the HTTP/JSON RPC surface between the
//! gateway and the backend services.
//!
//! Every response carries an explicit `success` flag and a
//! human-readable `message`; errors additionally map to transport
//! status codes (see [`crate::errors::CommonError::status_code`]).

use serde::{Deserialize, Serialize};

use crate::models::ids::{MemberId, VideoId};
use crate::models::member::MemberStatus;
use crate::models::video::{VideoStatus, VideoType};

/// Uniform failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFailure {
    pub success: bool,
    pub message: String,
}

impl RpcFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Uniform success envelope for operations without a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAck {
    pub success: bool,
    pub message: String,
}

impl RpcAck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ---- member service ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceLogoutRequest {
    pub member_id: MemberId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSessionResponse {
    pub success: bool,
    /// True when the signature is invalid or the cache entry is gone.
    pub expired: bool,
}

/// Public member profile; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    pub member_id: MemberId,
    pub email: String,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMemberResponse {
    pub success: bool,
    pub member: MemberProfile,
}

// ---- streaming service ----

/// Metadata frame sent before any upload chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub video_type: VideoType,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub video_id: VideoId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetVideoResponse {
    pub success: bool,
    pub video_id: VideoId,
    pub title: String,
    pub hls_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: VideoId,
    pub title: String,
    pub description: String,
    /// Object key of the original upload.
    pub file_name: String,
    #[serde(rename = "type")]
    pub video_type: VideoType,
    pub status: VideoStatus,
    pub view_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoListResponse {
    pub success: bool,
    pub videos: Vec<VideoSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_metadata_wire_shape() {
        let meta: UploadMetadata = serde_json::from_str(
            r#"{"title":"t","description":"d","type":"short","file_name":"v.mp4"}"#,
        )
        .unwrap();
        assert_eq!(meta.video_type, VideoType::Short);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "short");
    }

    #[test]
    fn test_member_profile_has_no_hash_field() {
        let profile = MemberProfile {
            member_id: MemberId::generate(),
            email: "a@x".into(),
            status: MemberStatus::Offline,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("password"));
    }
}
