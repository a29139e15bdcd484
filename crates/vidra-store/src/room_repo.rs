//! Chat room repository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use vidra_commons::{JoinMode, MemberId, Room, RoomId, RoomType};

use crate::error::{StoreError, StoreResult};

/// Room store operations.
#[async_trait]
pub trait RoomRepo: Send + Sync {
    async fn create(&self, room: &Room) -> StoreResult<()>;

    async fn find_by_id(&self, room_id: &RoomId) -> StoreResult<Option<Room>>;

    /// Add a member. Idempotent: adding an existing member is a
    /// no-op, and concurrent adds commute (server-side array append
    /// guarded by a membership predicate).
    async fn add_member(&self, room_id: &RoomId, member: &MemberId) -> StoreResult<()>;

    /// Remove a member from the room.
    async fn remove_member(&self, room_id: &RoomId, member: &MemberId) -> StoreResult<()>;

    /// Find the private room of an unordered member pair, if any.
    async fn find_private_room(
        &self,
        a: &MemberId,
        b: &MemberId,
    ) -> StoreResult<Option<Room>>;
}

/// Postgres implementation of [`RoomRepo`].
pub struct PgRoomRepo {
    pool: PgPool,
}

impl PgRoomRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROOM_COLUMNS: &str =
    "room_id, room_type, name, members, admins, join_mode, password, is_private, is_invite, created_at";

fn ids_from_strings(what: &str, raw: Vec<String>) -> StoreResult<Vec<MemberId>> {
    raw.into_iter()
        .map(|s| {
            MemberId::try_new(s).map_err(|e| StoreError::Corrupt(format!("{what}: {e}")))
        })
        .collect()
}

fn row_to_room(row: &sqlx::postgres::PgRow) -> StoreResult<Room> {
    let room_id: String = row.try_get("room_id")?;
    let room_type: String = row.try_get("room_type")?;
    let join_mode: String = row.try_get("join_mode")?;
    let members: Vec<String> = row.try_get("members")?;
    let admins: Vec<String> = row.try_get("admins")?;

    Ok(Room {
        room_id: RoomId::try_new(room_id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        room_type: RoomType::parse(&room_type)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown room type {room_type:?}")))?,
        name: row.try_get("name")?,
        members: ids_from_strings("room member", members)?,
        admins: ids_from_strings("room admin", admins)?,
        join_mode: JoinMode::parse(&join_mode)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown join mode {join_mode:?}")))?,
        password: row.try_get("password")?,
        is_private: row.try_get("is_private")?,
        is_invite: row.try_get("is_invite")?,
        created_at: row.try_get("created_at")?,
    })
}

fn ids_to_strings(ids: &[MemberId]) -> Vec<String> {
    ids.iter().map(|m| m.as_str().to_string()).collect()
}

#[async_trait]
impl RoomRepo for PgRoomRepo {
    async fn create(&self, room: &Room) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO rooms (room_id, room_type, name, members, admins, join_mode, password, is_private, is_invite, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(room.room_id.as_str())
        .bind(room.room_type.as_str())
        .bind(&room.name)
        .bind(ids_to_strings(&room.members))
        .bind(ids_to_strings(&room.admins))
        .bind(room.join_mode.as_str())
        .bind(&room.password)
        .bind(room.is_private)
        .bind(room.is_invite)
        .bind(room.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "room already exists"))?;
        Ok(())
    }

    async fn find_by_id(&self, room_id: &RoomId) -> StoreResult<Option<Room>> {
        let row = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE room_id = $1"
        ))
        .bind(room_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn add_member(&self, room_id: &RoomId, member: &MemberId) -> StoreResult<()> {
        // The membership predicate makes concurrent joins commute and
        // re-joins no-ops; zero rows affected therefore does not
        // distinguish "absent room" from "already a member".
        sqlx::query(
            "UPDATE rooms SET members = array_append(members, $2)
             WHERE room_id = $1 AND NOT ($2 = ANY(members))",
        )
        .bind(room_id.as_str())
        .bind(member.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_member(&self, room_id: &RoomId, member: &MemberId) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE rooms SET members = array_remove(members, $2) WHERE room_id = $1",
        )
        .bind(room_id.as_str())
        .bind(member.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("room {room_id}")));
        }
        Ok(())
    }

    async fn find_private_room(
        &self,
        a: &MemberId,
        b: &MemberId,
    ) -> StoreResult<Option<Room>> {
        let row = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE room_type = 'private' AND members @> ARRAY[$1, $2]
             LIMIT 1"
        ))
        .bind(a.as_str())
        .bind(b.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_room).transpose()
    }
}
