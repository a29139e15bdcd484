//! Durable transcode queue over a Redis Stream consumer group.
//!
//! Producers `XADD` JSON job payloads; the worker reads through a
//! consumer group so an in-flight job is owned until `XACK`. Negative
//! acknowledgement re-publishes the payload with an incremented
//! attempt counter and acks the claimed entry — after `max_attempts`
//! the payload is diverted to the dead-letter stream instead of
//! looping forever.

use async_trait::async_trait;
use log::{info, warn};
use redis::aio::ConnectionManager;
use redis::streams::{StreamAutoClaimOptions, StreamAutoClaimReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use vidra_commons::constants::{TRANSCODE_DEAD_STREAM, TRANSCODE_GROUP, TRANSCODE_STREAM};
use vidra_commons::TranscodingJob;

use crate::error::{BrokerError, BrokerResult};

/// Field name carrying the JSON payload inside a stream entry.
const PAYLOAD_FIELD: &str = "job";

/// Producer side of the queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publish a job for exactly-once-until-acked consumption.
    async fn publish(&self, job: &TranscodingJob) -> BrokerResult<()>;
}

/// A job claimed from the queue. Must be resolved with
/// [`RedisJobQueue::ack`] or [`RedisJobQueue::nack_requeue`].
#[derive(Debug, Clone)]
pub struct JobDelivery {
    pub entry_id: String,
    pub job: TranscodingJob,
}

/// Redis Streams implementation of the transcode queue.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
    max_attempts: u32,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager, max_attempts: u32) -> Self {
        Self { conn, max_attempts }
    }

    /// Create the consumer group if it does not exist yet.
    pub async fn ensure_group(&self) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(TRANSCODE_STREAM, TRANSCODE_GROUP, "$")
            .await;
        match result {
            Ok(()) => {
                info!("created consumer group {TRANSCODE_GROUP} on {TRANSCODE_STREAM}");
                Ok(())
            }
            // BUSYGROUP: the group already exists, which is fine.
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(BrokerError::from(e)),
        }
    }

    /// Block up to `block_ms` waiting for the next job.
    ///
    /// Entries whose payload does not parse are diverted straight to
    /// the dead-letter stream and acked — a payload that never parses
    /// would otherwise redeliver forever.
    pub async fn next_job(
        &self,
        consumer: &str,
        block_ms: usize,
    ) -> BrokerResult<Option<JobDelivery>> {
        let mut conn = self.conn.clone();
        let options = StreamReadOptions::default()
            .group(TRANSCODE_GROUP, consumer)
            .block(block_ms)
            .count(1);

        let reply: StreamReadReply = conn
            .xread_options(&[TRANSCODE_STREAM], &[">"], &options)
            .await?;

        for key in reply.keys {
            for entry in key.ids {
                match Self::delivery_from_entry(entry.id.clone(), &entry.map) {
                    Ok(delivery) => return Ok(Some(delivery)),
                    Err(e) => self.divert_malformed(entry.id, &entry.map, e).await?,
                }
            }
        }
        Ok(None)
    }

    /// Claim entries another consumer left pending (crashed worker),
    /// making them this consumer's deliveries.
    pub async fn reclaim_stale(
        &self,
        consumer: &str,
        min_idle_ms: usize,
    ) -> BrokerResult<Vec<JobDelivery>> {
        let mut conn = self.conn.clone();
        let reply: StreamAutoClaimReply = conn
            .xautoclaim_options(
                TRANSCODE_STREAM,
                TRANSCODE_GROUP,
                consumer,
                min_idle_ms,
                "0-0",
                StreamAutoClaimOptions::default().count(10),
            )
            .await?;

        let mut deliveries = Vec::new();
        for entry in reply.claimed {
            match Self::delivery_from_entry(entry.id.clone(), &entry.map) {
                Ok(delivery) => deliveries.push(delivery),
                Err(e) => self.divert_malformed(entry.id, &entry.map, e).await?,
            }
        }
        Ok(deliveries)
    }

    /// Ship an unparseable entry's raw payload to the dead-letter
    /// stream and ack it out of the pending list.
    async fn divert_malformed(
        &self,
        entry_id: String,
        map: &std::collections::HashMap<String, redis::Value>,
        reason: BrokerError,
    ) -> BrokerResult<()> {
        warn!("diverting malformed queue entry {entry_id}: {reason}");

        let raw = map
            .get(PAYLOAD_FIELD)
            .and_then(|v| redis::from_redis_value::<String>(v).ok())
            .unwrap_or_default();

        let mut conn = self.conn.clone();
        conn.xadd::<_, _, _, _, ()>(TRANSCODE_DEAD_STREAM, "*", &[(PAYLOAD_FIELD, raw.as_str())])
            .await?;
        conn.xack::<_, _, _, ()>(TRANSCODE_STREAM, TRANSCODE_GROUP, &[&entry_id])
            .await?;
        Ok(())
    }

    /// Positive acknowledgement: the job is done and released.
    pub async fn ack(&self, delivery: &JobDelivery) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        conn.xack::<_, _, _, ()>(TRANSCODE_STREAM, TRANSCODE_GROUP, &[&delivery.entry_id])
            .await?;
        Ok(())
    }

    /// Negative acknowledgement with requeue.
    ///
    /// Re-publishes the payload with `attempts + 1` (or diverts it to
    /// the dead-letter stream once the cap is reached), then acks the
    /// claimed entry so it stops being pending.
    pub async fn nack_requeue(&self, delivery: &JobDelivery) -> BrokerResult<()> {
        let mut job = delivery.job.clone();
        job.attempts += 1;

        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&job)?;

        if job.attempts >= self.max_attempts {
            warn!(
                "job for video {} exhausted {} attempts, moving to {TRANSCODE_DEAD_STREAM}",
                job.video_id, job.attempts
            );
            conn.xadd::<_, _, _, _, ()>(
                TRANSCODE_DEAD_STREAM,
                "*",
                &[(PAYLOAD_FIELD, payload.as_str())],
            )
            .await?;
        } else {
            conn.xadd::<_, _, _, _, ()>(
                TRANSCODE_STREAM,
                "*",
                &[(PAYLOAD_FIELD, payload.as_str())],
            )
            .await?;
        }

        conn.xack::<_, _, _, ()>(TRANSCODE_STREAM, TRANSCODE_GROUP, &[&delivery.entry_id])
            .await?;
        Ok(())
    }

    fn delivery_from_entry(
        entry_id: String,
        map: &std::collections::HashMap<String, redis::Value>,
    ) -> BrokerResult<JobDelivery> {
        let value = map
            .get(PAYLOAD_FIELD)
            .ok_or_else(|| BrokerError::MalformedEntry(entry_id.clone()))?;
        let raw: String = redis::from_redis_value(value)
            .map_err(|_| BrokerError::MalformedEntry(entry_id.clone()))?;
        let job: TranscodingJob = serde_json::from_str(&raw)?;
        Ok(JobDelivery { entry_id, job })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn publish(&self, job: &TranscodingJob) -> BrokerResult<()> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();
        conn.xadd::<_, _, _, _, ()>(TRANSCODE_STREAM, "*", &[(PAYLOAD_FIELD, payload.as_str())])
            .await?;
        Ok(())
    }
}
