//! External media tool integration (ffmpeg).
//!
//! Stream materialization and audio demux both run ffmpeg in stream-copy
//! mode; nothing is re-encoded, so the operations are I/O bound and fast.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Media operations the engine needs from an external tool
///
/// # Examples
///
/// ```no_run
/// use botload::media::{FfmpegTool, MediaTool};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = FfmpegTool::from_path().expect("ffmpeg not found in PATH");
/// tool.remux_stream_copy(
///     "https://cdn.example.com/v/720p/index.m3u8",
///     Path::new("/tmp/out/lesson.mp4"),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Remux a source (HLS variant URL or local file) into `dest` without
    /// re-encoding
    async fn remux_stream_copy(&self, src: &str, dest: &Path) -> Result<()>;

    /// Extract the audio track of a local video into `dest` without
    /// re-encoding
    async fn demux_audio(&self, video: &Path, dest: &Path) -> Result<()>;
}

/// [`MediaTool`] backed by the external ffmpeg binary
pub struct FfmpegTool {
    binary_path: PathBuf,
}

impl FfmpegTool {
    /// Create a tool with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    async fn run(&self, args: &[&str]) -> Result<()> {
        debug!(binary = ?self.binary_path, ?args, "running ffmpeg");

        let output = Command::new(&self.binary_path)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            // ffmpeg writes its diagnostics to stderr; surface them verbatim
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn remux_stream_copy(&self, src: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let dest_str = dest.to_string_lossy();
        self.run(&["-y", "-i", src, "-c", "copy", dest_str.as_ref()])
            .await?;

        info!(src = %src, dest = ?dest, "stream-copy remux complete");
        Ok(())
    }

    async fn demux_audio(&self, video: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let video_str = video.to_string_lossy();
        let dest_str = dest.to_string_lossy();
        self.run(&[
            "-y",
            "-i",
            video_str.as_ref(),
            "-vn",
            "-acodec",
            "copy",
            dest_str.as_ref(),
        ])
        .await?;

        info!(video = ?video, dest = ?dest, "audio demux complete");
        Ok(())
    }
}
