//! Error types for media helpers

use thiserror::Error;

/// Result type alias using FrameError
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors that can occur while extracting or bundling frames
#[derive(Debug, Error)]
pub enum FrameError {
    /// The extractor binary could not be launched
    #[error("Frame extractor not found: {0}")]
    ExtractorNotFound(String),

    /// The extractor ran but reported failure
    #[error("Frame extractor failed (exit status {status}): {stderr}")]
    ExtractorFailed { status: i32, stderr: String },

    /// The extractor did not finish in time
    #[error("Frame extractor timed out after {0}s")]
    ExtractorTimedOut(u64),

    /// Sampling rate must be a positive, finite number of frames per second
    #[error("Invalid sampling rate: {0} Hz")]
    InvalidSamplingRate(f32),

    /// Archive creation failed
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error while staging or collecting files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
