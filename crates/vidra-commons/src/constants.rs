//! Fixed names shared across services: token transport, pub/sub
//! topics and queue streams.

/// Query parameter the gateway and chat service read the token from.
pub const TOKEN_QUERY_PARAM: &str = "auth";

/// Cookie fallback for the token.
pub const TOKEN_COOKIE: &str = "auth_token";

/// Issuer written into minted tokens.
pub const TOKEN_ISSUER: &str = "vidra-member";

/// Durable stream carrying transcoding jobs.
pub const TRANSCODE_STREAM: &str = "transcode";

/// Dead-letter stream for jobs that exhausted their redeliveries.
pub const TRANSCODE_DEAD_STREAM: &str = "transcode:dead";

/// Consumer group name on [`TRANSCODE_STREAM`].
pub const TRANSCODE_GROUP: &str = "transcoders";

/// Per-member fan-out topic. Every connected member is subscribed to
/// their own topic for the lifetime of the connection.
pub fn member_topic(member_id: &str) -> String {
    format!("chat:user:{member_id}")
}

/// Per-room topic, subscribed while a connection is inside the room.
pub fn room_topic(room_id: &str) -> String {
    format!("chat:room:{room_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(member_topic("m-1"), "chat:user:m-1");
        assert_eq!(room_topic("r-9"), "chat:room:r-9");
    }
}
