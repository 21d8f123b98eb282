//! Frame extraction adapter
//!
//! Stages video bytes to a scoped temporary directory, runs the configured
//! [`FrameExtractor`] and collects the produced images. The staging
//! directory is a `tempfile::TempDir`, so every artifact is removed when the
//! adapter returns, whether extraction succeeded or not.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};
use crate::extractor::FrameExtractor;

/// Output naming pattern handed to the extractor (zero-padded index)
pub const FRAME_PATTERN: &str = "frame_%03d.png";

const FRAME_PREFIX: &str = "frame_";
const FRAME_SUFFIX: &str = ".png";
const INPUT_FILENAME: &str = "input.mp4";

/// One extracted frame image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Position in the extracted sequence, starting at 0
    pub index: usize,
    /// Filename the extractor generated (e.g. `frame_001.png`)
    pub filename: String,
    /// PNG image bytes
    #[serde(with = "crate::base64_bytes")]
    pub bytes: Vec<u8>,
}

/// Wraps a [`FrameExtractor`] with input staging and output collection
#[derive(Clone)]
pub struct FrameExtractionAdapter {
    extractor: Arc<dyn FrameExtractor>,
}

impl FrameExtractionAdapter {
    /// Create an adapter around the given extractor
    pub fn new(extractor: Arc<dyn FrameExtractor>) -> Self {
        Self { extractor }
    }

    /// Sample `video` at `sampling_rate_hz` and return the frames in
    /// generated-filename order.
    pub async fn extract_frames(&self, video: &[u8], sampling_rate_hz: f32) -> Result<Vec<Frame>> {
        if !sampling_rate_hz.is_finite() || sampling_rate_hz <= 0.0 {
            return Err(FrameError::InvalidSamplingRate(sampling_rate_hz));
        }

        let staging = tempfile::Builder::new().prefix("cut-frames-").tempdir()?;
        let input_path = staging.path().join(INPUT_FILENAME);
        tokio::fs::write(&input_path, video).await?;

        let pattern = staging.path().join(FRAME_PATTERN);
        self.extractor
            .extract(&input_path, &pattern, sampling_rate_hz)
            .await?;

        let frames = collect_frames(staging.path()).await?;
        log::info!(
            "Extracted {} frames at {} Hz from {} bytes of video",
            frames.len(),
            sampling_rate_hz,
            video.len()
        );

        if let Err(e) = staging.close() {
            log::warn!("Failed to clean up frame staging directory: {}", e);
        }

        Ok(frames)
    }
}

/// Read every `frame_*.png` in `dir`, sorted lexically by filename.
async fn collect_frames(dir: &Path) -> Result<Vec<Frame>> {
    let mut filenames = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(FRAME_PREFIX) && name.ends_with(FRAME_SUFFIX) {
            filenames.push(name);
        }
    }
    filenames.sort();

    let mut frames = Vec::with_capacity(filenames.len());
    for (index, filename) in filenames.into_iter().enumerate() {
        let bytes = tokio::fs::read(dir.join(&filename)).await?;
        frames.push(Frame {
            index,
            filename,
            bytes,
        });
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Writes a fixed set of files next to the pattern and remembers where.
    struct ScriptedExtractor {
        files: Vec<(&'static str, &'static str)>,
        fail: bool,
        seen: Mutex<Option<(PathBuf, f32, Vec<u8>)>>,
    }

    impl ScriptedExtractor {
        fn writing(files: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                files,
                fail: false,
                seen: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                files: vec![("frame_001.png", "partial")],
                fail: true,
                seen: Mutex::new(None),
            }
        }

        fn staging_dir(&self) -> PathBuf {
            self.seen.lock().unwrap().as_ref().unwrap().0.clone()
        }
    }

    #[async_trait]
    impl FrameExtractor for ScriptedExtractor {
        async fn extract(
            &self,
            input: &Path,
            output_pattern: &Path,
            sampling_rate_hz: f32,
        ) -> Result<()> {
            assert!(output_pattern.ends_with(FRAME_PATTERN));
            let dir = output_pattern.parent().unwrap().to_path_buf();
            let staged = std::fs::read(input).unwrap();
            *self.seen.lock().unwrap() = Some((dir.clone(), sampling_rate_hz, staged));

            for (name, bytes) in &self.files {
                std::fs::write(dir.join(name), bytes.as_bytes()).unwrap();
            }
            if self.fail {
                return Err(FrameError::ExtractorFailed {
                    status: 1,
                    stderr: "decode error".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_frames_ordered_by_filename() {
        let extractor = Arc::new(ScriptedExtractor::writing(vec![
            ("frame_010.png", "ten"),
            ("frame_002.png", "two"),
            ("frame_001.png", "one"),
            ("notes.txt", "ignored"),
        ]));
        let adapter = FrameExtractionAdapter::new(extractor.clone());

        let frames = adapter.extract_frames(b"video", 8.0).await.unwrap();

        let names: Vec<_> = frames.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["frame_001.png", "frame_002.png", "frame_010.png"]);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[2].index, 2);
        assert_eq!(frames[2].bytes, b"ten");

        let seen = extractor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.1, 8.0);
        assert_eq!(seen.2, b"video");
    }

    #[tokio::test]
    async fn test_staging_removed_after_success() {
        let extractor = Arc::new(ScriptedExtractor::writing(vec![("frame_001.png", "one")]));
        let adapter = FrameExtractionAdapter::new(extractor.clone());

        adapter.extract_frames(b"video", 8.0).await.unwrap();

        assert!(!extractor.staging_dir().exists());
    }

    #[tokio::test]
    async fn test_staging_removed_after_failure() {
        let extractor = Arc::new(ScriptedExtractor::failing());
        let adapter = FrameExtractionAdapter::new(extractor.clone());

        let result = adapter.extract_frames(b"video", 8.0).await;

        assert!(matches!(result, Err(FrameError::ExtractorFailed { .. })));
        assert!(!extractor.staging_dir().exists());
    }

    #[tokio::test]
    async fn test_no_frames_is_empty_sequence() {
        let adapter = FrameExtractionAdapter::new(Arc::new(ScriptedExtractor::writing(vec![])));
        let frames = adapter.extract_frames(b"video", 4.0).await.unwrap();
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_rate() {
        let adapter = FrameExtractionAdapter::new(Arc::new(ScriptedExtractor::writing(vec![])));
        assert!(matches!(
            adapter.extract_frames(b"video", 0.0).await,
            Err(FrameError::InvalidSamplingRate(_))
        ));
        assert!(matches!(
            adapter.extract_frames(b"video", f32::NAN).await,
            Err(FrameError::InvalidSamplingRate(_))
        ));
    }
}
