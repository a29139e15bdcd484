//! Typed session store over the KV façade.

use std::sync::Arc;
use std::time::Duration;

use vidra_commons::{MemberId, SessionRecord};

use crate::error::SessionResult;
use crate::kv::KvStore;

/// Live-session records keyed by member external id.
///
/// At most one live session per member: `put` overwrites whatever
/// session was there, which is exactly the login-overwrites-login
/// semantics the member service wants.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore<SessionRecord>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore<SessionRecord>>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Session TTL this store was configured with.
    pub fn session_ttl(&self) -> Duration {
        self.ttl
    }

    /// Write the session under the member's id with a fresh TTL.
    pub async fn put(&self, session: &SessionRecord) -> SessionResult<()> {
        self.kv
            .set(session.member_id.as_str(), session, self.ttl)
            .await
    }

    /// Fetch the live session, `None` if absent or expired.
    pub async fn get(&self, member_id: &MemberId) -> SessionResult<Option<SessionRecord>> {
        self.kv.get(member_id.as_str()).await
    }

    /// Drop the session (logout / force logout).
    pub async fn remove(&self, member_id: &MemberId) -> SessionResult<()> {
        self.kv.del(member_id.as_str()).await
    }

    /// Whether the member currently has a live session.
    ///
    /// Liveness is the cache TTL, nothing else: present with TTL > 0
    /// means live, anything else means expired.
    pub async fn is_live(&self, member_id: &MemberId) -> SessionResult<bool> {
        Ok(self.kv.ttl(member_id.as_str()).await?.is_some())
    }

    /// Extend the session TTL back to the full window (reconnect).
    /// Returns `false` when there is no session to extend.
    pub async fn extend(&self, member_id: &MemberId) -> SessionResult<bool> {
        self.kv.extend_ttl(member_id.as_str(), self.ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use chrono::Utc;

    fn record(member_id: &MemberId, token: &str) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            token: token.to_string(),
            member_id: member_id.clone(),
            created_at: now,
            last_activity: now,
            expires_at: now + chrono::Duration::seconds(60),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_previous_session() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()), Duration::from_secs(60));
        let member = MemberId::generate();

        store.put(&record(&member, "first")).await.unwrap();
        store.put(&record(&member, "second")).await.unwrap();

        let session = store.get(&member).await.unwrap().unwrap();
        assert_eq!(session.token, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_follows_ttl() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()), Duration::from_secs(60));
        let member = MemberId::generate();

        assert!(!store.is_live(&member).await.unwrap());
        store.put(&record(&member, "t")).await.unwrap();
        assert!(store.is_live(&member).await.unwrap());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!store.is_live(&member).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_resets_the_window() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()), Duration::from_secs(60));
        let member = MemberId::generate();
        store.put(&record(&member, "t")).await.unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(store.extend(&member).await.unwrap());

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(store.is_live(&member).await.unwrap());

        store.remove(&member).await.unwrap();
        assert!(!store.extend(&member).await.unwrap());
    }
}
