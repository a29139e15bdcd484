//! Transcoder seam.
//!
//! Transcoding is delegated to an external binary; the trait keeps
//! the worker testable without one on the machine.

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use log::{debug, info};
use thiserror::Error;
use tokio::process::Command;

/// Errors from a transcode run.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The binary could not be launched.
    #[error("failed to launch transcoder: {0}")]
    Launch(String),

    /// The binary ran and exited non-zero.
    #[error("transcoder failed ({status}): {output}")]
    Failed { status: String, output: String },
}

/// Converts one local input file into streaming artifacts in an
/// output directory.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Produce `index.m3u8` plus `.ts` segments in `output_dir`.
    async fn transcode_to_hls(&self, input: &Path, output_dir: &Path)
        -> Result<(), TranscodeError>;

    /// Produce a DASH `manifest.mpd` in `output_dir`.
    async fn transcode_to_dash(&self, input: &Path, output_dir: &Path)
        -> Result<(), TranscodeError>;
}

/// [`Transcoder`] shelling out to ffmpeg.
pub struct FfmpegTranscoder {
    binary: String,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }

    /// Use a specific ffmpeg binary (containers often pin a path).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(), TranscodeError> {
        debug!("running {} {}", self.binary, args.join(" "));
        let output: Output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| TranscodeError::Launch(e.to_string()))?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode_to_hls(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        let playlist = output_dir.join("index.m3u8");
        info!("transcoding {} to HLS", input.display());

        // H.264 video, AAC audio, 4-second segments, unbounded playlist
        self.run(&[
            "-i",
            &input.to_string_lossy(),
            "-c:v",
            "libx264",
            "-c:a",
            "aac",
            "-f",
            "hls",
            "-hls_time",
            "4",
            "-hls_list_size",
            "0",
            &playlist.to_string_lossy(),
        ])
        .await
    }

    async fn transcode_to_dash(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        let manifest = output_dir.join("manifest.mpd");
        info!("transcoding {} to DASH", input.display());

        self.run(&[
            "-i",
            &input.to_string_lossy(),
            "-c:v",
            "libx264",
            "-c:a",
            "aac",
            "-f",
            "dash",
            &manifest.to_string_lossy(),
        ])
        .await
    }
}
