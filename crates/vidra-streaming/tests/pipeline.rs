//! Upload → transcode → serve pipeline tests over an in-memory
//! object store, an in-memory video repo, a recording queue and a
//! mock transcoder.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use object_store::memory::InMemory;

use vidra_broker::{BrokerResult, JobQueue};
use vidra_commons::rpc::UploadMetadata;
use vidra_commons::{CommonError, TranscodingJob, Video, VideoId, VideoStatus, VideoType};
use vidra_filestore::BlobStore;
use vidra_store::{NewVideo, StoreError, StoreResult, VideoRepo};
use vidra_streaming::{JobProcessor, StreamingService, TranscodeError, Transcoder};

// ---- doubles ----

#[derive(Default)]
struct MemVideoRepo {
    videos: Mutex<HashMap<String, Video>>,
}

#[async_trait]
impl VideoRepo for MemVideoRepo {
    async fn create(&self, new: NewVideo) -> StoreResult<()> {
        let mut videos = self.videos.lock().unwrap();
        if videos.contains_key(new.video_id.as_str()) {
            return Err(StoreError::Conflict("video already exists".into()));
        }
        videos.insert(
            new.video_id.as_str().to_string(),
            Video {
                video_id: new.video_id,
                title: new.title,
                description: new.description,
                video_type: new.video_type,
                object_key: new.object_key,
                status: VideoStatus::Uploaded,
                view_count: 0,
            },
        );
        Ok(())
    }

    async fn get(&self, video_id: &VideoId) -> StoreResult<Option<Video>> {
        Ok(self.videos.lock().unwrap().get(video_id.as_str()).cloned())
    }

    async fn update_object_key(&self, video_id: &VideoId, object_key: &str) -> StoreResult<()> {
        let mut videos = self.videos.lock().unwrap();
        let video = videos
            .get_mut(video_id.as_str())
            .ok_or_else(|| StoreError::NotFound(video_id.to_string()))?;
        video.object_key = object_key.to_string();
        Ok(())
    }

    async fn advance_status(
        &self,
        video_id: &VideoId,
        status: VideoStatus,
    ) -> StoreResult<bool> {
        let mut videos = self.videos.lock().unwrap();
        let video = videos
            .get_mut(video_id.as_str())
            .ok_or_else(|| StoreError::NotFound(video_id.to_string()))?;
        if video.status.rank() < status.rank() {
            video.status = status;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn search(&self, keyword: &str) -> StoreResult<Vec<Video>> {
        let needle = keyword.to_lowercase();
        Ok(self
            .videos
            .lock()
            .unwrap()
            .values()
            .filter(|v| {
                v.status == VideoStatus::Ready
                    && (v.title.to_lowercase().contains(&needle)
                        || v.description.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn recommend(&self, limit: i64) -> StoreResult<Vec<Video>> {
        let mut videos: Vec<Video> = self.videos.lock().unwrap().values().cloned().collect();
        videos.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        videos.truncate(limit as usize);
        Ok(videos)
    }

    async fn increment_view_count(&self, video_id: &VideoId) -> StoreResult<()> {
        if let Some(video) = self.videos.lock().unwrap().get_mut(video_id.as_str()) {
            video.view_count += 1;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
struct RecordingQueue {
    jobs: Arc<Mutex<Vec<TranscodingJob>>>,
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn publish(&self, job: &TranscodingJob) -> BrokerResult<()> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// Transcoder double producing a playlist and one segment.
struct MockTranscoder;

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode_to_hls(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        // the worker downloads the original before transcoding
        assert!(input.exists(), "input {} must exist", input.display());
        std::fs::write(
            output_dir.join("index.m3u8"),
            b"#EXTM3U\n#EXT-X-VERSION:3\nsegment0.ts\n",
        )
        .map_err(|e| TranscodeError::Launch(e.to_string()))?;
        std::fs::write(output_dir.join("segment0.ts"), b"ts segment payload")
            .map_err(|e| TranscodeError::Launch(e.to_string()))?;
        Ok(())
    }

    async fn transcode_to_dash(
        &self,
        _input: &Path,
        _output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        unimplemented!("not exercised")
    }
}

/// Transcoder double that always fails.
struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode_to_hls(
        &self,
        _input: &Path,
        _output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        Err(TranscodeError::Failed {
            status: "exit status: 1".into(),
            output: "boom".into(),
        })
    }

    async fn transcode_to_dash(
        &self,
        _input: &Path,
        _output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        unimplemented!("not exercised")
    }
}

struct Fixture {
    service: StreamingService,
    videos: Arc<MemVideoRepo>,
    blobs: BlobStore,
    queue: RecordingQueue,
    tmp: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let videos = Arc::new(MemVideoRepo::default());
    let blobs = BlobStore::new(Arc::new(InMemory::new()));
    let queue = RecordingQueue::default();
    let tmp = tempfile::tempdir().unwrap();

    let service = StreamingService::new(
        videos.clone(),
        blobs.clone(),
        Arc::new(queue.clone()),
        tmp.path(),
        "http://127.0.0.1:8083",
    );
    Fixture {
        service,
        videos,
        blobs,
        queue,
        tmp,
    }
}

fn metadata(file_name: &str) -> UploadMetadata {
    UploadMetadata {
        title: "t".into(),
        description: "d".into(),
        video_type: VideoType::Short,
        file_name: file_name.into(),
    }
}

fn chunks(parts: &[&'static [u8]]) -> impl futures_util::Stream<Item = Result<Bytes, std::convert::Infallible>> + Unpin {
    stream::iter(
        parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p)))
            .collect::<Vec<_>>(),
    )
}

// ---- upload pipeline ----

#[tokio::test]
async fn upload_stages_row_blob_and_queue_in_order() {
    let f = fixture();

    let video_id = f
        .service
        .upload_video(metadata("v.mp4"), chunks(&[b"chunk one ", b"chunk two"]))
        .await
        .unwrap();

    // row points at the object key, still awaiting transcode
    let video = f.videos.get(&video_id).await.unwrap().unwrap();
    let expected_key = format!("original/{video_id}/v.mp4");
    assert_eq!(video.object_key, expected_key);
    assert_eq!(video.status, VideoStatus::Uploaded);

    // blob holds the concatenated chunks
    let stored = f.blobs.get_bytes(&expected_key).await.unwrap();
    assert_eq!(stored, Bytes::from_static(b"chunk one chunk two"));

    // exactly one queue message, attempts zero
    let jobs = f.queue.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].video_id, video_id);
    assert_eq!(jobs[0].file_name, expected_key);
    assert_eq!(jobs[0].video_type, VideoType::Short);
    assert_eq!(jobs[0].attempts, 0);

    // the staging file is gone
    let leftovers: Vec<_> = std::fs::read_dir(f.tmp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "staging dir should be empty");
}

#[tokio::test]
async fn upload_rejects_bad_metadata() {
    let f = fixture();

    let err = f
        .service
        .upload_video(metadata(""), chunks(&[b"data"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CommonError::InvalidInput(_)));

    let err = f
        .service
        .upload_video(metadata("../escape.mp4"), chunks(&[b"data"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CommonError::InvalidInput(_)));

    assert!(f.queue.jobs.lock().unwrap().is_empty());
}

// ---- transcode worker ----

fn processor(f: &Fixture, transcoder: Arc<dyn Transcoder>) -> JobProcessor {
    JobProcessor::new(f.videos.clone(), f.blobs.clone(), transcoder, f.tmp.path())
}

#[tokio::test]
async fn transcode_job_promotes_video_to_ready_and_artifacts_round_trip() {
    let f = fixture();

    let video_id = f
        .service
        .upload_video(metadata("v.mp4"), chunks(&[b"mp4 bytes"]))
        .await
        .unwrap();
    let job = f.queue.jobs.lock().unwrap()[0].clone();

    // before the worker runs, playback is refused
    let err = f.service.get_video(&video_id).await.unwrap_err();
    assert!(matches!(err, CommonError::InvalidInput(_)));

    processor(&f, Arc::new(MockTranscoder))
        .process(&job)
        .await
        .unwrap();

    // commit point reached
    let video = f.videos.get(&video_id).await.unwrap().unwrap();
    assert_eq!(video.status, VideoStatus::Ready);

    // playlist served byte-identical, starting with #EXTM3U
    let playlist = f.service.get_index_m3u8(&video_id).await.unwrap();
    assert!(playlist.starts_with(b"#EXTM3U"));

    // segment round-trip
    let segment = f
        .service
        .get_hls_segment(&video_id, "segment0.ts")
        .await
        .unwrap();
    assert_eq!(segment, Bytes::from_static(b"ts segment payload"));

    // playback info now resolves with the HLS URL
    let info = f.service.get_video(&video_id).await.unwrap();
    assert_eq!(
        info.hls_url,
        format!("http://127.0.0.1:8083/video/hls/{video_id}/index.m3u8")
    );

    // scratch space cleaned up
    let leftovers: Vec<_> = std::fs::read_dir(f.tmp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "worker scratch should be cleaned");
}

#[tokio::test]
async fn failed_transcode_leaves_video_unready() {
    let f = fixture();

    let video_id = f
        .service
        .upload_video(metadata("v.mp4"), chunks(&[b"mp4 bytes"]))
        .await
        .unwrap();
    let job = f.queue.jobs.lock().unwrap()[0].clone();

    assert!(processor(&f, Arc::new(FailingTranscoder))
        .process(&job)
        .await
        .is_err());

    let video = f.videos.get(&video_id).await.unwrap().unwrap();
    assert_eq!(video.status, VideoStatus::Processing);
    assert!(f.service.get_video(&video_id).await.is_err());
}

// ---- status monotonicity / read path ----

#[tokio::test]
async fn status_never_moves_backward() {
    let f = fixture();
    let video_id = f
        .service
        .upload_video(metadata("v.mp4"), chunks(&[b"x"]))
        .await
        .unwrap();

    assert!(f.videos.advance_status(&video_id, VideoStatus::Processing).await.unwrap());
    assert!(f.videos.advance_status(&video_id, VideoStatus::Ready).await.unwrap());

    // backward and same-rank transitions are refused
    assert!(!f.videos.advance_status(&video_id, VideoStatus::Processing).await.unwrap());
    assert!(!f.videos.advance_status(&video_id, VideoStatus::Uploaded).await.unwrap());
    assert!(!f.videos.advance_status(&video_id, VideoStatus::Ready).await.unwrap());
}

#[tokio::test]
async fn search_filters_by_keyword_and_ready_status() {
    let f = fixture();

    for (title, ready) in [("Sample 1", true), ("Sample 2", true), ("Sample draft", false)] {
        let id = f
            .service
            .upload_video(
                UploadMetadata {
                    title: title.into(),
                    description: "d".into(),
                    video_type: VideoType::Short,
                    file_name: "v.mp4".into(),
                },
                chunks(&[b"x"]),
            )
            .await
            .unwrap();
        if ready {
            f.videos.advance_status(&id, VideoStatus::Processing).await.unwrap();
            f.videos.advance_status(&id, VideoStatus::Ready).await.unwrap();
        }
    }

    let mut titles: Vec<String> = f
        .service
        .search("sample")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.title)
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Sample 1", "Sample 2"]);
}

#[tokio::test]
async fn recommend_orders_by_view_count() {
    let f = fixture();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            f.service
                .upload_video(metadata("v.mp4"), chunks(&[b"x"]))
                .await
                .unwrap(),
        );
    }
    for id in &ids {
        f.videos.advance_status(id, VideoStatus::Ready).await.unwrap();
    }

    // watch the last video twice, the second once
    f.service.get_video(&ids[2]).await.unwrap();
    f.service.get_video(&ids[2]).await.unwrap();
    f.service.get_video(&ids[1]).await.unwrap();

    let recommended = f.service.recommend(2).await.unwrap();
    assert_eq!(recommended.len(), 2);
    assert_eq!(recommended[0].video_id, ids[2]);
    assert_eq!(recommended[1].video_id, ids[1]);
}
