//! Generic TTL key/value store façade.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SessionResult;

/// Key/value store with per-key TTL.
///
/// Serialization of `V` is the implementation's concern; callers deal
/// in typed values only. `get` on an absent or expired key returns
/// `Ok(None)` — expiry is not an error, it is the mechanism.
#[async_trait]
pub trait KvStore<V>: Send + Sync
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    /// Write `value` under `key` with the given TTL, replacing any
    /// previous value and its TTL.
    async fn set(&self, key: &str, value: &V, ttl: Duration) -> SessionResult<()>;

    /// Read the value under `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> SessionResult<Option<V>>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> SessionResult<()>;

    /// Remaining TTL in whole seconds; `None` if the key is absent,
    /// expired, or has no TTL.
    async fn ttl(&self, key: &str) -> SessionResult<Option<u64>>;

    /// Reset the TTL of an existing key. Returns `false` when the key
    /// does not exist (nothing to extend).
    async fn extend_ttl(&self, key: &str, ttl: Duration) -> SessionResult<bool>;
}
