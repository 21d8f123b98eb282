//! External frame-extraction collaborator
//!
//! The extractor turns one video file into a directory of sequentially
//! numbered images. The default implementation shells out to `ffmpeg` using
//! `tokio::process::Command` with a timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{FrameError, Result};

/// Default timeout in seconds for one extraction run
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Something that can sample a video file into numbered image files.
///
/// `output_pattern` is a printf-style path (e.g. `/tmp/x/frame_%03d.png`);
/// implementations must write frames using exactly that pattern.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Sample `input` at `sampling_rate_hz` frames per second
    async fn extract(&self, input: &Path, output_pattern: &Path, sampling_rate_hz: f32)
        -> Result<()>;
}

/// Frame extractor backed by the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    /// Program to run (a bare name is resolved through PATH)
    program: PathBuf,
    /// Maximum wall-clock time for one run
    timeout: Duration,
}

impl FfmpegExtractor {
    /// Create an extractor that runs the given program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the timeout for one extraction run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program this extractor launches
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn build_args(input: &Path, output_pattern: &Path, sampling_rate_hz: f32) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            format!("fps={}", sampling_rate_hz),
            output_pattern.display().to_string(),
        ]
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        input: &Path,
        output_pattern: &Path,
        sampling_rate_hz: f32,
    ) -> Result<()> {
        let args = Self::build_args(input, output_pattern, sampling_rate_hz);
        log::debug!("Running {} {}", self.program.display(), args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FrameError::ExtractorNotFound(self.program.display().to_string())
            } else {
                FrameError::Io(e)
            }
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FrameError::ExtractorTimedOut(self.timeout.as_secs()))??;

        if !output.status.success() {
            return Err(FrameError::ExtractorFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
