//! Chat fan-out over Redis pub/sub.
//!
//! Topics are `chat:user:{member_id}` (always subscribed while a
//! member is connected) and `chat:room:{room_id}` (subscribed while
//! the member is inside the room). Payloads are JSON-encoded
//! [`ChatMessage`] values.

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::task::JoinHandle;

use vidra_commons::ChatMessage;

use crate::error::BrokerResult;

/// Publishing side of the fan-out bus.
#[async_trait]
pub trait ChatPublisher: Send + Sync {
    /// Publish a message to one topic. Delivery is fire-and-forget;
    /// absent subscribers are not an error.
    async fn publish(&self, topic: &str, message: &ChatMessage) -> BrokerResult<()>;
}

/// [`ChatPublisher`] over a shared Redis connection manager.
#[derive(Clone)]
pub struct RedisChatPublisher {
    conn: ConnectionManager,
}

impl RedisChatPublisher {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ChatPublisher for RedisChatPublisher {
    async fn publish(&self, topic: &str, message: &ChatMessage) -> BrokerResult<()> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(topic, payload).await?;
        Ok(())
    }
}

/// A running subscription. Dropping or cancelling it aborts the
/// listener task and closes its pub/sub connection, which is how
/// `leave_room` and disconnect tear subscriptions down.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribing side of the fan-out bus.
///
/// Each subscription runs on its own task with a dedicated pub/sub
/// connection; the handler is invoked for every decodable payload.
#[derive(Clone)]
pub struct RedisChatSubscriber {
    client: redis::Client,
}

impl RedisChatSubscriber {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn from_url(url: &str) -> BrokerResult<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    /// Subscribe `handler` to `topic` until the returned handle is
    /// cancelled or dropped.
    pub async fn subscribe<F>(&self, topic: &str, handler: F) -> BrokerResult<Subscription>
    where
        F: Fn(ChatMessage) + Send + Sync + 'static,
    {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;

        let topic = topic.to_string();
        let task = tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("unreadable payload on {topic}: {e}");
                        continue;
                    }
                };
                match serde_json::from_str::<ChatMessage>(&payload) {
                    Ok(message) => handler(message),
                    Err(e) => warn!("undecodable chat message on {topic}: {e}"),
                }
            }
            debug!("subscription to {topic} ended");
        });

        Ok(Subscription { task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use vidra_commons::MemberId;

    /// Publisher double recording every publish, for use-case tests.
    #[derive(Default, Clone)]
    pub struct RecordingPublisher {
        pub published: Arc<Mutex<Vec<(String, ChatMessage)>>>,
    }

    #[async_trait]
    impl ChatPublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, message: &ChatMessage) -> BrokerResult<()> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), message.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_recording_publisher_captures_topic_and_payload() {
        let publisher = RecordingPublisher::default();
        let msg = ChatMessage::new(MemberId::generate(), "hi".into(), 1000);
        publisher.publish("chat:user:abc", &msg).await.unwrap();

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "chat:user:abc");
        assert_eq!(published[0].1.content, "hi");
    }
}
