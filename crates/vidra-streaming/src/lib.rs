//! # vidra-streaming
//!
//! The streaming service: receives chunked uploads, stages them into
//! object storage, queues transcoding work, runs the transcode worker
//! (ffmpeg shell-out to HLS), and serves playlists and segments back.
//!
//! A video becomes visible to viewers only at the `ready` commit
//! point, written by the worker after every artifact landed in the
//! object store.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod transcoder;
pub mod worker;

pub use config::StreamingConfig;
pub use service::StreamingService;
pub use transcoder::{FfmpegTranscoder, TranscodeError, Transcoder};
pub use worker::{JobProcessor, TranscodeWorker};
