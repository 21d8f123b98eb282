//! Media helpers for SpriteFlow
//!
//! This crate wraps the external collaborators that turn generated video into
//! sprite frames, plus the small pieces of binary plumbing the rest of the
//! workspace shares:
//!
//! - `FrameExtractionAdapter`: stages video bytes into a scoped temporary
//!   directory, runs a `FrameExtractor` (ffmpeg by default) and reads the
//!   numbered frame images back in filename order
//! - `bundle_frames`: packs extracted frames into a zip archive
//! - `base64_bytes`: serde helper that carries binary payloads as base64 text
//!
//! # Example
//!
//! ```ignore
//! use media_tools::{FfmpegExtractor, FrameExtractionAdapter};
//! use std::sync::Arc;
//!
//! let adapter = FrameExtractionAdapter::new(Arc::new(FfmpegExtractor::default()));
//! let frames = adapter.extract_frames(&video_bytes, 8.0).await?;
//! ```

pub mod archive;
pub mod base64_bytes;
pub mod error;
pub mod extractor;
pub mod frames;

pub use archive::{bundle_entries, bundle_frames};
pub use error::{FrameError, Result};
pub use extractor::{FfmpegExtractor, FrameExtractor};
pub use frames::{Frame, FrameExtractionAdapter, FRAME_PATTERN};
