//! Day-bucketed message repository.
//!
//! One JSONB document per `(room, date)`. The two mutations are
//! written so concurrent writers commute: appends are server-side
//! array concatenation under `ON CONFLICT`, and read-by insertion is
//! a conditional rewrite that no-ops when the member is already in
//! the set. Nobody read-modify-writes a whole bucket.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::{PgPool, Row};

use vidra_commons::{bucket_date, ChatMessage, MemberId, MessageBucket, MessageId, RoomId, RoomUnreadInfo};

use crate::error::{StoreError, StoreResult};

/// Result of a mark-read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    /// Member was appended to the message's read set.
    Updated,
    /// Member was already in the read set; nothing changed.
    AlreadyRead,
    /// No such message in the `(room, date)` bucket.
    NotFound,
}

/// Message bucket store operations.
#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Append a message to the `(room, date)` bucket, creating the
    /// bucket if absent. Concurrent appends both land.
    async fn append_message(
        &self,
        room_id: &RoomId,
        date: &str,
        message: &ChatMessage,
    ) -> StoreResult<()>;

    /// Fetch one bucket.
    async fn find_bucket(
        &self,
        room_id: &RoomId,
        date: &str,
    ) -> StoreResult<Option<MessageBucket>>;

    /// Add `member` to the read set of one message. Idempotent.
    async fn mark_read(
        &self,
        room_id: &RoomId,
        date: &str,
        message_id: &MessageId,
        member: &MemberId,
    ) -> StoreResult<MarkReadOutcome>;

    /// Earliest bucket (ascending date) containing any message whose
    /// read set does not include `member`.
    async fn find_earliest_unread(
        &self,
        member: &MemberId,
        room_id: &RoomId,
    ) -> StoreResult<Option<MessageBucket>>;

    /// Messages of the bucket holding `before_ts` with a strictly
    /// smaller timestamp. Cross-day pagination is out of scope.
    async fn find_messages_before(
        &self,
        room_id: &RoomId,
        before_ts: i64,
    ) -> StoreResult<Vec<ChatMessage>>;

    /// Per-room unread aggregate for `member`: count and newest
    /// unread timestamp, sorted by that timestamp descending.
    async fn count_unread_by_room(&self, member: &MemberId)
        -> StoreResult<Vec<RoomUnreadInfo>>;
}

/// Postgres implementation of [`MessageRepo`].
pub struct PgMessageRepo {
    pool: PgPool,
}

impl PgMessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn messages_from_value(raw: serde_json::Value) -> StoreResult<Vec<ChatMessage>> {
    serde_json::from_value(raw).map_err(StoreError::from)
}

#[async_trait]
impl MessageRepo for PgMessageRepo {
    async fn append_message(
        &self,
        room_id: &RoomId,
        date: &str,
        message: &ChatMessage,
    ) -> StoreResult<()> {
        let payload = serde_json::to_value(message)?;
        sqlx::query(
            "INSERT INTO message_buckets (room_id, date, messages)
             VALUES ($1, $2, jsonb_build_array($3))
             ON CONFLICT (room_id, date)
             DO UPDATE SET messages = message_buckets.messages || jsonb_build_array($3)",
        )
        .bind(room_id.as_str())
        .bind(date)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_bucket(
        &self,
        room_id: &RoomId,
        date: &str,
    ) -> StoreResult<Option<MessageBucket>> {
        let row = sqlx::query(
            "SELECT messages FROM message_buckets WHERE room_id = $1 AND date = $2",
        )
        .bind(room_id.as_str())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let raw: serde_json::Value = row.try_get("messages")?;
                Ok(Some(MessageBucket {
                    room_id: room_id.clone(),
                    date: date.to_string(),
                    messages: messages_from_value(raw)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn mark_read(
        &self,
        room_id: &RoomId,
        date: &str,
        message_id: &MessageId,
        member: &MemberId,
    ) -> StoreResult<MarkReadOutcome> {
        // Presence and already-read checks first; the update below is
        // idempotent, so a racing reader at worst repeats a no-op.
        let row = sqlx::query(
            "SELECT
                 bool_or(msg->>'message_id' = $3) AS found,
                 bool_or(msg->>'message_id' = $3 AND msg->'read_by' ? $4) AS already
             FROM message_buckets, jsonb_array_elements(messages) AS msg
             WHERE room_id = $1 AND date = $2",
        )
        .bind(room_id.as_str())
        .bind(date)
        .bind(message_id.as_str())
        .bind(member.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let (found, already) = match row {
            Some(row) => (
                row.try_get::<Option<bool>, _>("found")?.unwrap_or(false),
                row.try_get::<Option<bool>, _>("already")?.unwrap_or(false),
            ),
            None => (false, false),
        };

        if !found {
            return Ok(MarkReadOutcome::NotFound);
        }
        if already {
            return Ok(MarkReadOutcome::AlreadyRead);
        }

        sqlx::query(
            "UPDATE message_buckets SET messages = (
                 SELECT COALESCE(jsonb_agg(
                     CASE WHEN t.msg->>'message_id' = $3 AND NOT t.msg->'read_by' ? $4
                          THEN jsonb_set(t.msg, '{read_by}', t.msg->'read_by' || to_jsonb($4::text))
                          ELSE t.msg
                     END ORDER BY t.ord), '[]'::jsonb)
                 FROM jsonb_array_elements(messages) WITH ORDINALITY AS t(msg, ord)
             )
             WHERE room_id = $1 AND date = $2",
        )
        .bind(room_id.as_str())
        .bind(date)
        .bind(message_id.as_str())
        .bind(member.as_str())
        .execute(&self.pool)
        .await?;

        Ok(MarkReadOutcome::Updated)
    }

    async fn find_earliest_unread(
        &self,
        member: &MemberId,
        room_id: &RoomId,
    ) -> StoreResult<Option<MessageBucket>> {
        let rows = sqlx::query(
            "SELECT date, messages FROM message_buckets
             WHERE room_id = $1 ORDER BY date ASC",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let date: String = row.try_get("date")?;
            let raw: serde_json::Value = row.try_get("messages")?;
            let bucket = MessageBucket {
                room_id: room_id.clone(),
                date,
                messages: messages_from_value(raw)?,
            };
            if bucket.has_unread_for(member) {
                return Ok(Some(bucket));
            }
        }
        Ok(None)
    }

    async fn find_messages_before(
        &self,
        room_id: &RoomId,
        before_ts: i64,
    ) -> StoreResult<Vec<ChatMessage>> {
        let day = Utc
            .timestamp_opt(before_ts, 0)
            .single()
            .map(bucket_date)
            .ok_or_else(|| StoreError::Database(format!("invalid timestamp {before_ts}")))?;

        let bucket = self.find_bucket(room_id, &day).await?;
        Ok(bucket
            .map(|b| {
                b.messages
                    .into_iter()
                    .filter(|m| m.timestamp < before_ts)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_unread_by_room(
        &self,
        member: &MemberId,
    ) -> StoreResult<Vec<RoomUnreadInfo>> {
        // SQL rendering of the aggregate pipeline: unwind messages,
        // keep those whose read set misses the member, group per room
        // with count + max timestamp, newest first.
        let rows = sqlx::query(
            "SELECT b.room_id,
                    COUNT(*) AS unread_count,
                    MAX((msg->>'timestamp')::bigint) AS last_unread_timestamp
             FROM message_buckets AS b, jsonb_array_elements(b.messages) AS msg
             WHERE NOT msg->'read_by' ? $1
             GROUP BY b.room_id
             ORDER BY last_unread_timestamp DESC",
        )
        .bind(member.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let room_id: String = row.try_get("room_id")?;
                Ok(RoomUnreadInfo {
                    room_id: RoomId::try_new(room_id)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                    unread_count: row.try_get("unread_count")?,
                    last_unread_timestamp: row.try_get("last_unread_timestamp")?,
                })
            })
            .collect()
    }
}
