//! # vidra-chat
//!
//! The chat service: long-lived WebSocket sessions speaking a small
//! JSON action protocol against the room/invitation/message store,
//! with cross-node delivery over the pub/sub bus.
//!
//! Each connection is an actix actor. The read loop, the liveness
//! ping and the subscription callbacks all write through the actor
//! mailbox, so socket writes are serialized structurally rather than
//! by locking discipline.

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod messages;
pub mod rooms;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ChatConfig;
pub use state::ChatServices;
