//! Member repository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use vidra_commons::{Member, MemberId, MemberStatus};

use crate::error::{StoreError, StoreResult};

/// Fields of a member row to insert; the numeric id is assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub member_id: MemberId,
    pub email: String,
    pub password_hash: String,
}

/// Credential store operations.
#[async_trait]
pub trait MemberRepo: Send + Sync {
    /// Insert a member. Fails with [`StoreError::Conflict`] when the
    /// email is taken.
    async fn create(&self, new: NewMember) -> StoreResult<Member>;

    /// Look up by email, matched case-sensitively.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Member>>;

    /// Look up by external id.
    async fn find_by_member_id(&self, member_id: &MemberId) -> StoreResult<Option<Member>>;

    /// Persist a status change.
    async fn update_status(&self, member_id: &MemberId, status: MemberStatus) -> StoreResult<()>;
}

/// Postgres implementation of [`MemberRepo`].
pub struct PgMemberRepo {
    pool: PgPool,
}

impl PgMemberRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_member(row: &sqlx::postgres::PgRow) -> StoreResult<Member> {
    let member_id: String = row.try_get("member_id")?;
    let status: String = row.try_get("status")?;
    Ok(Member {
        numeric_id: row.try_get("id")?,
        member_id: MemberId::try_new(member_id)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        status: MemberStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown member status {status:?}")))?,
    })
}

#[async_trait]
impl MemberRepo for PgMemberRepo {
    async fn create(&self, new: NewMember) -> StoreResult<Member> {
        let row = sqlx::query(
            "INSERT INTO members (member_id, email, password_hash, status)
             VALUES ($1, $2, $3, 'offline')
             RETURNING id, member_id, email, password_hash, status",
        )
        .bind(new.member_id.as_str())
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "email already exists"))?;

        row_to_member(&row)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        let row = sqlx::query(
            "SELECT id, member_id, email, password_hash, status
             FROM members WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_member).transpose()
    }

    async fn find_by_member_id(&self, member_id: &MemberId) -> StoreResult<Option<Member>> {
        let row = sqlx::query(
            "SELECT id, member_id, email, password_hash, status
             FROM members WHERE member_id = $1",
        )
        .bind(member_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_member).transpose()
    }

    async fn update_status(&self, member_id: &MemberId, status: MemberStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE members SET status = $2 WHERE member_id = $1")
            .bind(member_id.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("member {member_id}")));
        }
        Ok(())
    }
}
