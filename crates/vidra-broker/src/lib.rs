//! # vidra-broker
//!
//! Cross-node messaging for Vidra: the pub/sub bus that fans chat
//! messages out to whichever node holds a recipient's connection,
//! and the durable work queue feeding the transcoding worker.
//!
//! Both ride Redis — topics on pub/sub channels, the queue on a
//! stream with a consumer group so jobs are owned while in flight,
//! released on ack and redelivered on nack.

pub mod error;
pub mod pubsub;
pub mod queue;

pub use error::{BrokerError, BrokerResult};
pub use pubsub::{ChatPublisher, RedisChatPublisher, RedisChatSubscriber, Subscription};
pub use queue::{JobDelivery, JobQueue, RedisJobQueue};
