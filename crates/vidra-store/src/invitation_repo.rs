//! Private-chat invitation repository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use vidra_commons::{Invitation, InvitationId, InvitationStatus, MemberId};

use crate::error::{StoreError, StoreResult};

/// Invitation store operations.
#[async_trait]
pub trait InvitationRepo: Send + Sync {
    /// Insert a pending invitation. Fails with
    /// [`StoreError::Conflict`] when the pair already has one pending
    /// (partial unique index).
    async fn create(&self, invitation: &Invitation) -> StoreResult<()>;

    /// Latest invitation for the ordered (inviter, invitee) pair.
    async fn find_latest_by_pair(
        &self,
        inviter: &MemberId,
        invitee: &MemberId,
    ) -> StoreResult<Option<Invitation>>;

    /// Pending invitation for the ordered pair, if any.
    async fn find_pending_by_pair(
        &self,
        inviter: &MemberId,
        invitee: &MemberId,
    ) -> StoreResult<Option<Invitation>>;

    /// All pending invitations addressed to a member.
    async fn find_pending_for_invitee(&self, invitee: &MemberId)
        -> StoreResult<Vec<Invitation>>;

    /// Move an invitation to a new status.
    async fn update_status(
        &self,
        invitation_id: &InvitationId,
        status: InvitationStatus,
    ) -> StoreResult<()>;
}

/// Postgres implementation of [`InvitationRepo`].
pub struct PgInvitationRepo {
    pool: PgPool,
}

impl PgInvitationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INVITATION_COLUMNS: &str = "invitation_id, inviter_id, invitee_id, status, created_at";

fn row_to_invitation(row: &sqlx::postgres::PgRow) -> StoreResult<Invitation> {
    let invitation_id: String = row.try_get("invitation_id")?;
    let inviter_id: String = row.try_get("inviter_id")?;
    let invitee_id: String = row.try_get("invitee_id")?;
    let status: String = row.try_get("status")?;

    Ok(Invitation {
        invitation_id: InvitationId::try_new(invitation_id)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        inviter_id: MemberId::try_new(inviter_id)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        invitee_id: MemberId::try_new(invitee_id)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        status: InvitationStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown invitation status {status:?}")))?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl InvitationRepo for PgInvitationRepo {
    async fn create(&self, invitation: &Invitation) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO invitations (invitation_id, inviter_id, invitee_id, status, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(invitation.invitation_id.as_str())
        .bind(invitation.inviter_id.as_str())
        .bind(invitation.invitee_id.as_str())
        .bind(invitation.status.as_str())
        .bind(invitation.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "invitation already pending"))?;
        Ok(())
    }

    async fn find_latest_by_pair(
        &self,
        inviter: &MemberId,
        invitee: &MemberId,
    ) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations
             WHERE inviter_id = $1 AND invitee_id = $2
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(inviter.as_str())
        .bind(invitee.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_invitation).transpose()
    }

    async fn find_pending_by_pair(
        &self,
        inviter: &MemberId,
        invitee: &MemberId,
    ) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations
             WHERE inviter_id = $1 AND invitee_id = $2 AND status = 'pending'"
        ))
        .bind(inviter.as_str())
        .bind(invitee.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_invitation).transpose()
    }

    async fn find_pending_for_invitee(
        &self,
        invitee: &MemberId,
    ) -> StoreResult<Vec<Invitation>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations
             WHERE invitee_id = $1 AND status = 'pending'
             ORDER BY created_at ASC"
        ))
        .bind(invitee.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_invitation).collect()
    }

    async fn update_status(
        &self,
        invitation_id: &InvitationId,
        status: InvitationStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE invitations SET status = $2 WHERE invitation_id = $1")
            .bind(invitation_id.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("invitation {invitation_id}")));
        }
        Ok(())
    }
}
