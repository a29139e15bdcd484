//! Video repository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use vidra_commons::{Video, VideoId, VideoStatus, VideoType};

use crate::error::{StoreError, StoreResult};

/// Fields of a video row to insert.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub video_id: VideoId,
    pub title: String,
    pub description: String,
    pub video_type: VideoType,
    /// Provisional key at insert time; updated to the object-store
    /// key once the blob lands.
    pub object_key: String,
    pub created_at: i64,
}

/// Video store operations.
#[async_trait]
pub trait VideoRepo: Send + Sync {
    /// Insert with `status = uploaded`.
    async fn create(&self, new: NewVideo) -> StoreResult<()>;

    async fn get(&self, video_id: &VideoId) -> StoreResult<Option<Video>>;

    /// Point the row at the object-store key of the original upload.
    async fn update_object_key(&self, video_id: &VideoId, object_key: &str) -> StoreResult<()>;

    /// Advance the processing status. Transitions only apply forward
    /// (`uploaded → processing → ready`); a backward or same-rank
    /// update is a no-op and reports `false`.
    async fn advance_status(&self, video_id: &VideoId, status: VideoStatus)
        -> StoreResult<bool>;

    /// Case-insensitive substring search over title and description,
    /// restricted to ready videos.
    async fn search(&self, keyword: &str) -> StoreResult<Vec<Video>>;

    /// Top `limit` videos by view count, descending.
    async fn recommend(&self, limit: i64) -> StoreResult<Vec<Video>>;

    /// Bump the view counter.
    async fn increment_view_count(&self, video_id: &VideoId) -> StoreResult<()>;
}

/// Postgres implementation of [`VideoRepo`].
pub struct PgVideoRepo {
    pool: PgPool,
}

impl PgVideoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const VIDEO_COLUMNS: &str =
    "video_id, title, description, video_type, object_key, status, view_count";

fn row_to_video(row: &sqlx::postgres::PgRow) -> StoreResult<Video> {
    let video_id: String = row.try_get("video_id")?;
    let video_type: String = row.try_get("video_type")?;
    let status: String = row.try_get("status")?;

    Ok(Video {
        video_id: VideoId::try_new(video_id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        video_type: VideoType::parse(&video_type)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown video type {video_type:?}")))?,
        object_key: row.try_get("object_key")?,
        status: VideoStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown video status {status:?}")))?,
        view_count: row.try_get("view_count")?,
    })
}

/// SQL expression ranking a status column for the monotonicity guard.
const STATUS_RANK: &str =
    "CASE {col} WHEN 'uploaded' THEN 1 WHEN 'processing' THEN 2 WHEN 'ready' THEN 3 ELSE 0 END";

fn rank_expr(col: &str) -> String {
    STATUS_RANK.replace("{col}", col)
}

#[async_trait]
impl VideoRepo for PgVideoRepo {
    async fn create(&self, new: NewVideo) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO videos (video_id, title, description, video_type, object_key, status, created_at)
             VALUES ($1, $2, $3, $4, $5, 'uploaded', $6)",
        )
        .bind(new.video_id.as_str())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.video_type.as_str())
        .bind(&new.object_key)
        .bind(new.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "video already exists"))?;
        Ok(())
    }

    async fn get(&self, video_id: &VideoId) -> StoreResult<Option<Video>> {
        let row = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE video_id = $1"
        ))
        .bind(video_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_video).transpose()
    }

    async fn update_object_key(&self, video_id: &VideoId, object_key: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE videos SET object_key = $2 WHERE video_id = $1")
            .bind(video_id.as_str())
            .bind(object_key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("video {video_id}")));
        }
        Ok(())
    }

    async fn advance_status(
        &self,
        video_id: &VideoId,
        status: VideoStatus,
    ) -> StoreResult<bool> {
        let sql = format!(
            "UPDATE videos SET status = $2 WHERE video_id = $1 AND {} < {}",
            rank_expr("status"),
            rank_expr("$2")
        );
        let result = sqlx::query(&sql)
            .bind(video_id.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn search(&self, keyword: &str) -> StoreResult<Vec<Video>> {
        let like = format!("%{keyword}%");
        let rows = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos
             WHERE (title ILIKE $1 OR description ILIKE $1) AND status = 'ready'
             ORDER BY created_at ASC"
        ))
        .bind(&like)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_video).collect()
    }

    async fn recommend(&self, limit: i64) -> StoreResult<Vec<Video>> {
        let rows = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos
             ORDER BY view_count DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_video).collect()
    }

    async fn increment_view_count(&self, video_id: &VideoId) -> StoreResult<()> {
        sqlx::query("UPDATE videos SET view_count = view_count + 1 WHERE video_id = $1")
            .bind(video_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
