//! Streaming use cases: the upload pipeline and the read path.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use log::{info, warn};
use tokio::io::AsyncWriteExt;

use vidra_broker::JobQueue;
use vidra_commons::rpc::UploadMetadata;
use vidra_commons::{CommonError, Result, TranscodingJob, Video, VideoId, VideoStatus};
use vidra_filestore::{original_key, processed_key, BlobStore, FilestoreError};
use vidra_store::{NewVideo, VideoRepo};

/// Playback info returned by `get_video`.
#[derive(Debug, Clone)]
pub struct PlaybackInfo {
    pub video_id: VideoId,
    pub title: String,
    pub hls_url: String,
}

/// Streaming use cases over the video store, the blob store and the
/// transcode queue.
pub struct StreamingService {
    videos: Arc<dyn VideoRepo>,
    blobs: BlobStore,
    queue: Arc<dyn JobQueue>,
    tmp_dir: PathBuf,
    public_base_url: String,
}

impl StreamingService {
    pub fn new(
        videos: Arc<dyn VideoRepo>,
        blobs: BlobStore,
        queue: Arc<dyn JobQueue>,
        tmp_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            videos,
            blobs,
            queue,
            tmp_dir: tmp_dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Run the upload pipeline for one video.
    ///
    /// The byte stream is staged into a temp file first — uploads can
    /// be multi-gigabyte, and the staged copy is what gets pushed to
    /// the object store. Steps run in durability order: row insert,
    /// blob upload, key update, queue publish; a failure at any step
    /// stops the pipeline and surfaces the error.
    pub async fn upload_video<S, E>(
        &self,
        metadata: UploadMetadata,
        mut chunks: S,
    ) -> Result<VideoId>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        if metadata.title.is_empty() || metadata.file_name.is_empty() {
            return Err(CommonError::invalid_input(
                "upload metadata requires title and file_name",
            ));
        }

        let video_id = VideoId::generate();
        let object_key = original_key(&video_id, &metadata.file_name)
            .map_err(|e| CommonError::invalid_input(e.to_string()))?;

        // 1. stage the stream into a local temp file
        tokio::fs::create_dir_all(&self.tmp_dir)
            .await
            .map_err(internal)?;
        let temp_path = self.tmp_dir.join(format!("{}_{}", video_id, metadata.file_name));
        let mut temp_file = tokio::fs::File::create(&temp_path).await.map_err(internal)?;

        let mut received: u64 = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(CommonError::internal(format!("upload stream error: {e}")));
                }
            };
            received += chunk.len() as u64;
            temp_file.write_all(&chunk).await.map_err(internal)?;
        }
        temp_file.flush().await.map_err(internal)?;
        drop(temp_file);
        info!("staged upload {video_id}: {received} bytes at {}", temp_path.display());

        // 2. insert the row with the provisional file name
        self.videos
            .create(NewVideo {
                video_id: video_id.clone(),
                title: metadata.title.clone(),
                description: metadata.description.clone(),
                video_type: metadata.video_type,
                object_key: metadata.file_name.clone(),
                created_at: Utc::now().timestamp(),
            })
            .await
            .map_err(internal)?;

        // 3. push the staged file into the object store
        self.blobs
            .put_file(&object_key, &temp_path)
            .await
            .map_err(internal)?;

        // 4. point the row at the stored object
        self.videos
            .update_object_key(&video_id, &object_key)
            .await
            .map_err(internal)?;

        // 5. queue the transcode, the last and most durable effect
        self.queue
            .publish(&TranscodingJob {
                video_id: video_id.clone(),
                file_name: object_key,
                video_type: metadata.video_type,
                attempts: 0,
            })
            .await
            .map_err(internal)?;

        // 6. drop the staging file
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            warn!("failed to remove staging file {}: {e}", temp_path.display());
        }

        info!("upload {video_id} queued for transcoding");
        Ok(video_id)
    }

    /// Playback info, only once the video reached `ready`.
    pub async fn get_video(&self, video_id: &VideoId) -> Result<PlaybackInfo> {
        let video = self.require_video(video_id).await?;
        if video.status != VideoStatus::Ready {
            return Err(CommonError::invalid_input("video not ready"));
        }

        if let Err(e) = self.videos.increment_view_count(video_id).await {
            warn!("view count bump failed for {video_id}: {e}");
        }

        Ok(PlaybackInfo {
            video_id: video.video_id,
            title: video.title,
            hls_url: format!("{}/video/hls/{video_id}/index.m3u8", self.public_base_url),
        })
    }

    /// Raw master playlist bytes.
    pub async fn get_index_m3u8(&self, video_id: &VideoId) -> Result<Bytes> {
        let key = processed_key(video_id, "index.m3u8")
            .map_err(|e| CommonError::invalid_input(e.to_string()))?;
        self.blobs.get_bytes(&key).await.map_err(blob_error)
    }

    /// Raw segment bytes.
    pub async fn get_hls_segment(&self, video_id: &VideoId, segment: &str) -> Result<Bytes> {
        let key = processed_key(video_id, segment)
            .map_err(|e| CommonError::invalid_input(e.to_string()))?;
        self.blobs.get_bytes(&key).await.map_err(blob_error)
    }

    /// Case-insensitive title/description search over ready videos.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Video>> {
        self.videos.search(keyword).await.map_err(internal)
    }

    /// Most-viewed videos, capped at `limit`.
    pub async fn recommend(&self, limit: i64) -> Result<Vec<Video>> {
        let limit = limit.clamp(1, 100);
        self.videos.recommend(limit).await.map_err(internal)
    }

    async fn require_video(&self, video_id: &VideoId) -> Result<Video> {
        self.videos
            .get(video_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| CommonError::not_found(format!("video {video_id}")))
    }
}

fn internal(e: impl std::fmt::Display) -> CommonError {
    CommonError::internal(e.to_string())
}

fn blob_error(e: FilestoreError) -> CommonError {
    match e {
        FilestoreError::NotFound(key) => CommonError::not_found(key),
        other => CommonError::internal(other.to_string()),
    }
}
