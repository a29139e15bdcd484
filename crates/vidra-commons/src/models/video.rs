//! Videos and transcoding jobs.

use serde::{Deserialize, Serialize};

use super::ids::VideoId;

/// Short-form or long-form content. Carried through the queue so the
/// worker could pick a profile per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Short,
    Long,
}

impl VideoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoType::Short => "short",
            VideoType::Long => "long",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(VideoType::Short),
            "long" => Some(VideoType::Long),
            _ => None,
        }
    }
}

/// Processing state of a video.
///
/// Advances strictly forward: `uploaded → processing → ready`.
/// Viewers see a video iff it is `ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploaded,
    Processing,
    Ready,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(VideoStatus::Uploaded),
            "processing" => Some(VideoStatus::Processing),
            "ready" => Some(VideoStatus::Ready),
            _ => None,
        }
    }

    /// Rank used to enforce forward-only transitions.
    pub fn rank(&self) -> i16 {
        match self {
            VideoStatus::Uploaded => 1,
            VideoStatus::Processing => 2,
            VideoStatus::Ready => 3,
        }
    }
}

/// An uploaded video.
///
/// `object_key` points at the original upload
/// (`original/{video_id}/{file_name}`) from the moment the blob
/// lands; processed artifacts live under `processed/{video_id}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub video_id: VideoId,
    pub title: String,
    pub description: String,
    pub video_type: VideoType,
    pub object_key: String,
    pub status: VideoStatus,
    pub view_count: i64,
}

/// Durable queue message requesting one transcode.
///
/// Owned by the queue while in flight; released on ack, redelivered
/// on nack. `attempts` counts deliveries so poisoned jobs can be
/// diverted to the dead-letter stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodingJob {
    pub video_id: VideoId,
    /// Object key of the original upload.
    pub file_name: String,
    #[serde(rename = "type")]
    pub video_type: VideoType,
    #[serde(default)]
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rank_is_monotonic() {
        assert!(VideoStatus::Uploaded.rank() < VideoStatus::Processing.rank());
        assert!(VideoStatus::Processing.rank() < VideoStatus::Ready.rank());
    }

    #[test]
    fn test_job_serde_shape() {
        let job = TranscodingJob {
            video_id: VideoId::generate(),
            file_name: "original/v/v.mp4".into(),
            video_type: VideoType::Short,
            attempts: 0,
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["type"], "short");
        assert_eq!(json["file_name"], "original/v/v.mp4");
        let back: TranscodingJob = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_job_attempts_default() {
        let job: TranscodingJob = serde_json::from_str(
            r#"{"video_id":"v1","file_name":"original/v1/a.mp4","type":"long"}"#,
        )
        .unwrap();
        assert_eq!(job.attempts, 0);
        assert_eq!(job.video_type, VideoType::Long);
    }
}
