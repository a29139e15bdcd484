//! Day-bucketed chat messages.
//!
//! All messages a room receives on one calendar day live in a single
//! bucket keyed by `(room_id, date)`. Hot writes append to one
//! document, and the per-day queries behind `enter_room` and
//! `get_unread` stay O(1) lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MemberId, MessageId, RoomId};

/// One chat message inside a bucket.
///
/// `read_by` is a set and always contains the sender. Order within a
/// bucket is append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: MessageId,
    pub sender_id: MemberId,
    pub content: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub read_by: Vec<MemberId>,
}

impl ChatMessage {
    /// Builds a fresh message with `read_by` seeded with the sender.
    pub fn new(sender_id: MemberId, content: String, timestamp: i64) -> Self {
        Self {
            message_id: MessageId::generate(),
            sender_id: sender_id.clone(),
            content,
            timestamp,
            read_by: vec![sender_id],
        }
    }

    pub fn is_read_by(&self, member: &MemberId) -> bool {
        self.read_by.iter().any(|m| m == member)
    }
}

/// All messages of one room on one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBucket {
    pub room_id: RoomId,
    /// Bucket date, `YYYY-MM-DD` in UTC.
    pub date: String,
    pub messages: Vec<ChatMessage>,
}

impl MessageBucket {
    /// Whether any message in the bucket is unread by `member`.
    pub fn has_unread_for(&self, member: &MemberId) -> bool {
        self.messages.iter().any(|m| !m.is_read_by(member))
    }
}

/// Per-room unread aggregate for one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUnreadInfo {
    pub room_id: RoomId,
    pub unread_count: i64,
    pub last_unread_timestamp: i64,
}

/// Bucket key for the given instant, `YYYY-MM-DD` in UTC.
pub fn bucket_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Bucket key for the current day.
pub fn today_bucket_date() -> String {
    bucket_date(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_date_format() {
        let at = Utc.with_ymd_and_hms(2025, 1, 23, 9, 30, 0).unwrap();
        assert_eq!(bucket_date(at), "2025-01-23");
    }

    #[test]
    fn test_new_message_read_by_contains_sender() {
        let sender = MemberId::generate();
        let msg = ChatMessage::new(sender.clone(), "hi".into(), 1000);
        assert!(msg.is_read_by(&sender));
        assert_eq!(msg.read_by.len(), 1);
    }

    #[test]
    fn test_bucket_unread_detection() {
        let sender = MemberId::generate();
        let reader = MemberId::generate();
        let bucket = MessageBucket {
            room_id: RoomId::generate(),
            date: "2025-01-23".into(),
            messages: vec![ChatMessage::new(sender, "hi".into(), 1000)],
        };
        assert!(bucket.has_unread_for(&reader));
        assert!(!bucket.has_unread_for(&bucket.messages[0].sender_id));
    }
}
