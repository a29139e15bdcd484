//! Transcode worker: the queue consumer.
//!
//! One long-running consumer per service instance, manual
//! acknowledgement only. A job is acked strictly after the `ready`
//! transition; every failure path nacks with requeue after a bounded
//! backoff, and poisoned payloads age out to the dead-letter stream
//! via the queue's attempt cap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::watch;

use vidra_broker::{JobDelivery, RedisJobQueue};
use vidra_commons::{TranscodingJob, VideoStatus};
use vidra_filestore::{processed_key, BlobStore};
use vidra_store::VideoRepo;

use crate::transcoder::Transcoder;

/// How long to block per queue poll.
const POLL_BLOCK_MS: usize = 5_000;

/// Pending entries idle this long are considered abandoned by a
/// crashed consumer and reclaimed.
const RECLAIM_IDLE_MS: usize = 60_000;

/// Executes one transcoding job end to end. Split from the consumer
/// loop so the pipeline is testable without a queue.
pub struct JobProcessor {
    videos: Arc<dyn VideoRepo>,
    blobs: BlobStore,
    transcoder: Arc<dyn Transcoder>,
    tmp_dir: PathBuf,
}

impl JobProcessor {
    pub fn new(
        videos: Arc<dyn VideoRepo>,
        blobs: BlobStore,
        transcoder: Arc<dyn Transcoder>,
        tmp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            videos,
            blobs,
            transcoder,
            tmp_dir: tmp_dir.into(),
        }
    }

    /// One transcode run: download, transcode, upload artifacts, mark
    /// ready, clean up. Object writes are idempotent under their
    /// keys, so a rerun after a crash is safe.
    pub async fn process(&self, job: &TranscodingJob) -> anyhow::Result<()> {
        let video_id = &job.video_id;

        // forward-only; a redelivered job on a processing row is fine
        self.videos
            .advance_status(video_id, VideoStatus::Processing)
            .await?;

        let input_path = self.tmp_dir.join(format!("{video_id}_original.mp4"));
        let output_dir = self.tmp_dir.join(format!("{video_id}_processed"));

        self.blobs.download_to(&job.file_name, &input_path).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        let transcode_result = self
            .transcoder
            .transcode_to_hls(&input_path, &output_dir)
            .await;
        if let Err(e) = transcode_result {
            self.cleanup(&input_path, &output_dir).await;
            return Err(e.into());
        }

        // ship every artifact with its content type
        let mut entries = tokio::fs::read_dir(&output_dir).await?;
        let mut uploaded = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = processed_key(video_id, &name)?;
            self.blobs.put_file(&key, &entry.path()).await?;
            uploaded += 1;
        }
        if uploaded == 0 {
            self.cleanup(&input_path, &output_dir).await;
            anyhow::bail!("transcoder produced no artifacts for video {video_id}");
        }

        // the commit point: viewers see the video from here on
        self.videos
            .advance_status(video_id, VideoStatus::Ready)
            .await?;
        info!("video {video_id} is ready ({uploaded} artifacts)");

        self.cleanup(&input_path, &output_dir).await;
        Ok(())
    }

    async fn cleanup(&self, input_path: &std::path::Path, output_dir: &std::path::Path) {
        if let Err(e) = tokio::fs::remove_file(input_path).await {
            warn!("cleanup of {} failed: {e}", input_path.display());
        }
        if let Err(e) = tokio::fs::remove_dir_all(output_dir).await {
            warn!("cleanup of {} failed: {e}", output_dir.display());
        }
    }
}

/// The transcoding consumer loop.
pub struct TranscodeWorker {
    queue: RedisJobQueue,
    processor: JobProcessor,
    nack_backoff: Duration,
    consumer_name: String,
}

impl TranscodeWorker {
    pub fn new(
        queue: RedisJobQueue,
        processor: JobProcessor,
        nack_backoff: Duration,
        consumer_name: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            processor,
            nack_backoff,
            consumer_name: consumer_name.into(),
        }
    }

    /// Consume until `shutdown` flips. In-flight work finishes (or
    /// nacks) before the loop exits; unacked entries are reclaimed by
    /// the next worker.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = self.queue.ensure_group().await {
            error!("could not ensure consumer group: {e}");
            return;
        }

        // pick up anything a crashed consumer left pending
        match self.queue.reclaim_stale(&self.consumer_name, RECLAIM_IDLE_MS).await {
            Ok(stale) => {
                for delivery in stale {
                    info!("reclaimed stale job for video {}", delivery.job.video_id);
                    self.handle_delivery(delivery).await;
                }
            }
            Err(e) => warn!("stale reclaim failed: {e}"),
        }

        info!("transcode worker {} started", self.consumer_name);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("transcode worker {} stopping", self.consumer_name);
                        return;
                    }
                }
                next = self.queue.next_job(&self.consumer_name, POLL_BLOCK_MS) => {
                    match next {
                        Ok(Some(delivery)) => self.handle_delivery(delivery).await,
                        Ok(None) => {}
                        Err(e) => {
                            warn!("queue read failed: {e}");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: JobDelivery) {
        info!(
            "processing transcode job: video={} key={} attempt={}",
            delivery.job.video_id, delivery.job.file_name, delivery.job.attempts
        );

        match self.processor.process(&delivery.job).await {
            Ok(()) => {
                if let Err(e) = self.queue.ack(&delivery).await {
                    warn!("ack failed for video {}: {e}", delivery.job.video_id);
                }
            }
            Err(e) => {
                error!("transcode failed for video {}: {e}", delivery.job.video_id);
                tokio::time::sleep(self.nack_backoff).await;
                if let Err(e) = self.queue.nack_requeue(&delivery).await {
                    warn!("nack failed for video {}: {e}", delivery.job.video_id);
                }
            }
        }
    }
}
