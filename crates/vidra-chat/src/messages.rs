//! Message use cases: persistence plus fan-out.

use std::sync::Arc;

use chrono::Utc;
use log::warn;

use vidra_broker::ChatPublisher;
use vidra_commons::constants::member_topic;
use vidra_commons::{
    today_bucket_date, ChatMessage, CommonError, MemberId, MessageBucket, MessageId, Result,
    RoomId, RoomUnreadInfo,
};
use vidra_store::{MarkReadOutcome, MessageRepo, RoomRepo};

/// What `enter_room` hands back: the earliest bucket with unread
/// messages, or today's already-read history when nothing is unread.
#[derive(Debug, Clone)]
pub enum EnterRoomMessages {
    Unread(MessageBucket),
    Recent(Vec<ChatMessage>),
}

/// Message operations over the bucket store and the fan-out bus.
pub struct MessageService {
    rooms: Arc<dyn RoomRepo>,
    messages: Arc<dyn MessageRepo>,
    publisher: Arc<dyn ChatPublisher>,
}

impl MessageService {
    pub fn new(
        rooms: Arc<dyn RoomRepo>,
        messages: Arc<dyn MessageRepo>,
        publisher: Arc<dyn ChatPublisher>,
    ) -> Self {
        Self {
            rooms,
            messages,
            publisher,
        }
    }

    /// Persist a message into today's bucket, then fan it out to
    /// every other room member's per-member topic.
    ///
    /// Persistence decides success; a failed publish to one recipient
    /// is logged and does not fail the send or skip the others.
    pub async fn send_message(
        &self,
        sender: &MemberId,
        room_id: &RoomId,
        content: String,
    ) -> Result<MessageId> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found("room not found"))?;

        let message = ChatMessage::new(sender.clone(), content, Utc::now().timestamp());
        let today = today_bucket_date();
        self.messages
            .append_message(room_id, &today, &message)
            .await
            .map_err(internal)?;

        for member in room.members.iter().filter(|m| *m != sender) {
            let topic = member_topic(member.as_str());
            if let Err(e) = self.publisher.publish(&topic, &message).await {
                warn!("fan-out to {topic} failed: {e}");
            }
        }

        Ok(message.message_id)
    }

    /// Add `member` to a message's read set in today's bucket.
    /// Re-reading an already-read message succeeds without change.
    pub async fn mark_read(
        &self,
        member: &MemberId,
        room_id: &RoomId,
        message_id: &MessageId,
    ) -> Result<()> {
        let today = today_bucket_date();
        match self
            .messages
            .mark_read(room_id, &today, message_id, member)
            .await
            .map_err(internal)?
        {
            MarkReadOutcome::Updated | MarkReadOutcome::AlreadyRead => Ok(()),
            MarkReadOutcome::NotFound => Err(CommonError::not_found("message not found")),
        }
    }

    /// Per-room unread aggregate for `member`, newest first.
    pub async fn unread_counts(&self, member: &MemberId) -> Result<Vec<RoomUnreadInfo>> {
        self.messages.count_unread_by_room(member).await.map_err(internal)
    }

    /// The messages shown on entering a room: earliest unread bucket
    /// if any, else today's messages before now.
    pub async fn enter_room_messages(
        &self,
        member: &MemberId,
        room_id: &RoomId,
    ) -> Result<EnterRoomMessages> {
        self.rooms
            .find_by_id(room_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found("room not found"))?;

        if let Some(bucket) = self
            .messages
            .find_earliest_unread(member, room_id)
            .await
            .map_err(internal)?
        {
            return Ok(EnterRoomMessages::Unread(bucket));
        }

        let recent = self
            .messages
            .find_messages_before(room_id, Utc::now().timestamp())
            .await
            .map_err(internal)?;
        Ok(EnterRoomMessages::Recent(recent))
    }
}

fn internal(e: impl std::fmt::Display) -> CommonError {
    CommonError::internal(e.to_string())
}
