//! # vidra-session
//!
//! The session cache: a generic TTL key/value façade with Redis and
//! in-memory implementations, and the typed [`SessionStore`] the
//! member service keeps live-session records in.
//!
//! The cache is the single source of truth for session liveness — a
//! session exists iff its key is present with a remaining TTL > 0.

pub mod error;
pub mod kv;
pub mod memory;
pub mod redis_store;
pub mod session_store;

pub use error::{SessionError, SessionResult};
pub use kv::KvStore;
pub use memory::MemoryKvStore;
pub use redis_store::{connect_redis, RedisKvStore};
pub use session_store::SessionStore;
