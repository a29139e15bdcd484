//! Member use cases.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info, warn};

use vidra_auth::{hash_password, mint_token, verify_password, verify_token, AuthError};
use vidra_commons::rpc::MemberProfile;
use vidra_commons::{CommonError, MemberId, MemberStatus, Result, Role, SessionRecord};
use vidra_session::SessionStore;
use vidra_store::{MemberRepo, NewMember, StoreError};

/// Member use cases over the credential store and session cache.
pub struct MemberService {
    members: Arc<dyn MemberRepo>,
    sessions: SessionStore,
    jwt_secret: String,
    bcrypt_cost: u32,
}

impl MemberService {
    pub fn new(
        members: Arc<dyn MemberRepo>,
        sessions: SessionStore,
        jwt_secret: String,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            members,
            sessions,
            jwt_secret,
            bcrypt_cost,
        }
    }

    /// Register a new member.
    ///
    /// Strength is checked before hashing; identity gets a fresh
    /// external id. Email uniqueness is enforced by the store.
    pub async fn register(&self, email: &str, password: &str) -> Result<MemberId> {
        if self.members.find_by_email(email).await.map_err(internal)?.is_some() {
            return Err(CommonError::already_exists("email already exists"));
        }

        let hash = match hash_password(password, self.bcrypt_cost).await {
            Ok(hash) => hash,
            Err(AuthError::WeakPassword(reason)) => {
                return Err(CommonError::invalid_input(format!("weak password: {reason}")))
            }
            Err(e) => return Err(CommonError::internal(e.to_string())),
        };

        let member_id = MemberId::generate();
        let created = self
            .members
            .create(NewMember {
                member_id: member_id.clone(),
                email: email.to_string(),
                password_hash: hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(msg) => CommonError::already_exists(msg),
                other => internal(other),
            })?;

        info!("registered member {} ({})", created.member_id, created.email);
        Ok(member_id)
    }

    /// Log a member in and return the signed session token.
    ///
    /// Step order matters: credentials are verified, the token is
    /// minted and the cache entry written, and only then is the
    /// online status persisted — the one durable side effect happens
    /// last so a failure on any earlier step commits nothing.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let member = self
            .members
            .find_by_email(email)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found("user not found"))?;

        match verify_password(password, &member.password_hash).await {
            Ok(()) => {}
            Err(AuthError::PasswordMismatch) => {
                warn!("login failed for {email}: password mismatch");
                return Err(CommonError::unauthenticated("password does not match"));
            }
            Err(e) => return Err(CommonError::internal(e.to_string())),
        }

        let ttl = self.sessions.session_ttl();
        let token = mint_token(&member.member_id, Role::Member, &self.jwt_secret, ttl.as_secs())
            .map_err(|e| CommonError::internal(e.to_string()))?;

        let now = Utc::now();
        let session = SessionRecord {
            token: token.clone(),
            member_id: member.member_id.clone(),
            created_at: now,
            last_activity: now,
            expires_at: now + Duration::seconds(ttl.as_secs() as i64),
        };
        self.sessions.put(&session).await.map_err(internal)?;

        self.members
            .update_status(&member.member_id, MemberStatus::Online)
            .await
            .map_err(internal)?;

        info!("member {} logged in", member.member_id);
        Ok(token)
    }

    /// Log out the member identified by the token.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let claims = self.verify(token)?;

        self.sessions.remove(&claims.user_id).await.map_err(internal)?;
        self.members
            .update_status(&claims.user_id, MemberStatus::Offline)
            .await
            .map_err(internal)?;

        info!("member {} logged out", claims.user_id);
        Ok(())
    }

    /// Drop a member's session without a token (admin tooling).
    pub async fn force_logout(&self, member_id: &MemberId) -> Result<()> {
        self.sessions.remove(member_id).await.map_err(internal)?;
        self.members
            .update_status(member_id, MemberStatus::Offline)
            .await
            .map_err(internal)?;

        info!("member {member_id} forcibly logged out");
        Ok(())
    }

    /// Whether the token's session has expired.
    ///
    /// The signature gets checked first, but the verdict belongs to
    /// the cache: a valid token whose cache entry is gone is expired.
    pub async fn check_session(&self, token: &str) -> Result<bool> {
        let claims = match verify_token(token, &self.jwt_secret) {
            Ok(claims) => claims,
            Err(_) => return Ok(true),
        };

        let live = self.sessions.is_live(&claims.user_id).await.map_err(internal)?;
        Ok(!live)
    }

    /// Extend the session TTL back to the full window. Does not
    /// rotate the token, so its `exp` claim and the cache TTL may
    /// diverge — the cache is authoritative.
    pub async fn reconnect(&self, token: &str) -> Result<()> {
        let claims = self.verify(token)?;

        let extended = self.sessions.extend(&claims.user_id).await.map_err(internal)?;
        if !extended {
            debug!("reconnect for {} found no live session", claims.user_id);
        }
        Ok(())
    }

    /// Public profile lookup by email.
    pub async fn find_member(&self, email: &str) -> Result<MemberProfile> {
        let member = self
            .members
            .find_by_email(email)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found(format!("no member with email {email}")))?;

        Ok(MemberProfile {
            member_id: member.member_id,
            email: member.email,
            status: member.status,
        })
    }

    fn verify(&self, token: &str) -> Result<vidra_auth::TokenClaims> {
        verify_token(token, &self.jwt_secret)
            .map_err(|e| CommonError::unauthenticated(e.to_string()))
    }
}

fn internal(e: impl std::fmt::Display) -> CommonError {
    CommonError::internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration as StdDuration;
    use tokio::sync::Mutex;
    use vidra_commons::Member;
    use vidra_session::MemoryKvStore;
    use vidra_store::StoreResult;

    /// In-memory credential store for use-case tests.
    #[derive(Default)]
    struct InMemoryMemberRepo {
        by_email: Mutex<HashMap<String, Member>>,
    }

    #[async_trait]
    impl MemberRepo for InMemoryMemberRepo {
        async fn create(&self, new: NewMember) -> StoreResult<Member> {
            let mut map = self.by_email.lock().await;
            if map.contains_key(&new.email) {
                return Err(StoreError::Conflict("email already exists".into()));
            }
            let member = Member {
                numeric_id: map.len() as i64 + 1,
                member_id: new.member_id,
                email: new.email.clone(),
                password_hash: new.password_hash,
                status: MemberStatus::Offline,
            };
            map.insert(new.email, member.clone());
            Ok(member)
        }

        async fn find_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
            Ok(self.by_email.lock().await.get(email).cloned())
        }

        async fn find_by_member_id(&self, member_id: &MemberId) -> StoreResult<Option<Member>> {
            Ok(self
                .by_email
                .lock()
                .await
                .values()
                .find(|m| &m.member_id == member_id)
                .cloned())
        }

        async fn update_status(
            &self,
            member_id: &MemberId,
            status: MemberStatus,
        ) -> StoreResult<()> {
            let mut map = self.by_email.lock().await;
            let member = map
                .values_mut()
                .find(|m| &m.member_id == member_id)
                .ok_or_else(|| StoreError::NotFound(member_id.to_string()))?;
            member.status = status;
            Ok(())
        }
    }

    const TTL: StdDuration = StdDuration::from_secs(60);

    fn service() -> MemberService {
        let sessions = SessionStore::new(Arc::new(MemoryKvStore::new()), TTL);
        MemberService::new(
            Arc::new(InMemoryMemberRepo::default()),
            sessions,
            "test-secret".to_string(),
            4,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_then_duplicate_email() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();
        let err = svc.register("a@x", "!Pass1234").await.unwrap_err();
        assert!(matches!(err, CommonError::AlreadyExists(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_rejects_weak_password() {
        let svc = service();
        let err = svc.register("a@x", "weakpass").await.unwrap_err();
        assert!(matches!(err, CommonError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_check_expire_cycle() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();

        let token = svc.login("a@x", "!Pass1234").await.unwrap();
        assert!(!svc.check_session(&token).await.unwrap());

        // advance past the session TTL: the cache entry dies and the
        // still-signature-valid token reports expired
        tokio::time::advance(TTL + StdDuration::from_secs(1)).await;
        assert!(svc.check_session(&token).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_errors() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();

        assert!(matches!(
            svc.login("missing@x", "!Pass1234").await.unwrap_err(),
            CommonError::NotFound(_)
        ));
        assert!(matches!(
            svc.login("a@x", "!Wrong1234").await.unwrap_err(),
            CommonError::Unauthenticated(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_login_overwrites_the_session() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();

        let _first = svc.login("a@x", "!Pass1234").await.unwrap();
        let second = svc.login("a@x", "!Pass1234").await.unwrap();

        // one live session per member: the cache holds exactly the
        // latest record under the member's key, so the earlier login
        // has nothing left granting it liveness
        let session = svc
            .sessions
            .get(&svc.find_member("a@x").await.unwrap().member_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.token, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_effective_and_second_logout_still_verifies_token() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();
        let token = svc.login("a@x", "!Pass1234").await.unwrap();

        svc.logout(&token).await.unwrap();
        assert!(svc.check_session(&token).await.unwrap());
        assert_eq!(
            svc.find_member("a@x").await.unwrap().status,
            MemberStatus::Offline
        );

        // the token still has a valid signature, so a second logout
        // succeeds as a no-op against the absent session
        svc.logout(&token).await.unwrap();
        assert!(matches!(
            svc.logout("garbage-token").await.unwrap_err(),
            CommonError::Unauthenticated(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_logout() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();
        let token = svc.login("a@x", "!Pass1234").await.unwrap();
        let member_id = svc.find_member("a@x").await.unwrap().member_id;

        svc.force_logout(&member_id).await.unwrap();
        assert!(svc.check_session(&token).await.unwrap());
        assert_eq!(
            svc.find_member("a@x").await.unwrap().status,
            MemberStatus::Offline
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_extends_the_session() {
        let svc = service();
        svc.register("a@x", "!Pass1234").await.unwrap();
        let token = svc.login("a@x", "!Pass1234").await.unwrap();

        tokio::time::advance(StdDuration::from_secs(50)).await;
        svc.reconnect(&token).await.unwrap();

        tokio::time::advance(StdDuration::from_secs(50)).await;
        assert!(!svc.check_session(&token).await.unwrap());

        assert!(matches!(
            svc.reconnect("garbage").await.unwrap_err(),
            CommonError::Unauthenticated(_)
        ));
    }
}
