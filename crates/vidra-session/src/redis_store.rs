//! Redis-backed implementation of [`KvStore`].

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{SessionError, SessionResult};
use crate::kv::KvStore;

/// Connect to Redis with a fixed-interval retry loop.
///
/// The manager reconnects on its own after transient drops; the retry
/// loop only covers initial startup ordering (service up before
/// Redis).
pub async fn connect_redis(
    url: &str,
    retry_count: u32,
    retry_interval: Duration,
) -> SessionResult<ConnectionManager> {
    let client = redis::Client::open(url).map_err(SessionError::from)?;

    let mut attempt = 0;
    loop {
        match ConnectionManager::new(client.clone()).await {
            Ok(manager) => {
                info!("connected to redis at {url}");
                return Ok(manager);
            }
            Err(e) if attempt < retry_count => {
                attempt += 1;
                warn!(
                    "redis connection failed (attempt {attempt}/{retry_count}): {e}, retrying in {}s",
                    retry_interval.as_secs()
                );
                tokio::time::sleep(retry_interval).await;
            }
            Err(e) => return Err(SessionError::from(e)),
        }
    }
}

/// [`KvStore`] over a shared Redis connection manager.
///
/// Values are stored JSON-encoded; TTLs ride Redis key expiry, which
/// makes the cache the authority on liveness with no sweeper of our
/// own.
#[derive(Clone)]
pub struct RedisKvStore<V> {
    conn: ConnectionManager,
    _marker: PhantomData<fn() -> V>,
}

impl<V> RedisKvStore<V> {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<V> KvStore<V> for RedisKvStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn set(&self, key: &str, value: &V, ttl: Duration) -> SessionResult<()> {
        let data = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, data, ttl.as_secs()).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> SessionResult<Option<V>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        match data {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> SessionResult<Option<u64>> {
        let mut conn = self.conn.clone();
        // TTL returns -2 for missing keys and -1 for keys without expiry
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        if ttl > 0 {
            Ok(Some(ttl as u64))
        } else {
            Ok(None)
        }
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> SessionResult<bool> {
        let mut conn = self.conn.clone();
        let updated: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }
}
