//! In-memory implementation of [`KvStore`] for tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::SessionResult;
use crate::kv::KvStore;

struct Entry {
    data: String,
    expires_at: Instant,
}

/// [`KvStore`] backed by a mutexed map with lazy expiry.
///
/// Expiry is checked on access against `tokio::time::Instant`, so
/// tests under `tokio::time::pause` can advance the clock and watch
/// sessions die without sleeping.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<V> KvStore<V> for MemoryKvStore
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn set(&self, key: &str, value: &V, ttl: Duration) -> SessionResult<()> {
        let data = serde_json::to_string(value)?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> SessionResult<Option<V>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                Ok(Some(serde_json::from_str(&entry.data)?))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> SessionResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> SessionResult<Option<u64>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) => {
                let now = Instant::now();
                if entry.expires_at > now {
                    Ok(Some((entry.expires_at - now).as_secs()))
                } else {
                    entries.remove(key);
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> SessionResult<bool> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                entry.expires_at = Instant::now() + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_get_del() {
        let store = MemoryKvStore::new();
        store
            .set("k", &"v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();
        let got: Option<String> = store.get("k").await.unwrap();
        assert_eq!(got, Some("v".to_string()));

        KvStore::<String>::del(&store, "k").await.unwrap();
        let got: Option<String> = store.get("k").await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let store = MemoryKvStore::new();
        store
            .set("k", &"v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        let got: Option<String> = store.get("k").await.unwrap();
        assert_eq!(got, None);
        assert_eq!(KvStore::<String>::ttl(&store, "k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_ttl() {
        let store = MemoryKvStore::new();
        store
            .set("k", &"v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(KvStore::<String>::extend_ttl(&store, "k", Duration::from_secs(10))
            .await
            .unwrap());

        tokio::time::advance(Duration::from_secs(8)).await;
        let got: Option<String> = store.get("k").await.unwrap();
        assert!(got.is_some());

        // extending an absent key reports false
        assert!(!KvStore::<String>::extend_ttl(&store, "gone", Duration::from_secs(5))
            .await
            .unwrap());
    }
}
