//! In-memory providers with scripted behaviour
//!
//! Used by tests across the workspace to drive the gateway without network
//! access. Each provider counts its calls so tests can assert how far a
//! fallback chain got.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use media_tools::FrameExtractor;

use crate::error::ProviderError;
use crate::provider::{
    ImageProvider, ImageRequest, ModelCatalog, ModelInfo, OperationHandle, OperationState,
    ResponseEnvelope, ResponsePart, VideoOutput, VideoProvider, VideoRequest,
};
use crate::task::MediaBlob;

/// A provider failure that can be replayed any number of times
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    RateLimited,
    Api(u16),
    InvalidResponse,
}

impl ScriptedFailure {
    fn to_error(&self) -> ProviderError {
        match self {
            Self::RateLimited => ProviderError::RateLimited("quota exceeded".to_string()),
            Self::Api(status) => ProviderError::Api {
                status: *status,
                message: "scripted failure".to_string(),
            },
            Self::InvalidResponse => {
                ProviderError::InvalidResponse("scripted failure".to_string())
            }
        }
    }
}

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Image provider returning a fixed envelope or failure
pub struct ScriptedImageProvider {
    id: String,
    outcome: Result<ResponseEnvelope, ScriptedFailure>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedImageProvider {
    /// Answers every request with a single image part
    pub fn returning_image(bytes: Vec<u8>) -> Self {
        Self::returning(ResponseEnvelope::new(vec![ResponsePart::Image(
            MediaBlob::png(bytes),
        )]))
    }

    pub fn returning(envelope: ResponseEnvelope) -> Self {
        Self {
            id: "scripted-image".to_string(),
            outcome: Ok(envelope),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: ScriptedFailure) -> Self {
        Self {
            id: "scripted-image".to_string(),
            outcome: Err(failure),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<ImageRequest> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl ImageProvider for ScriptedImageProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ResponseEnvelope, ProviderError> {
        locked(&self.requests).push(request.clone());
        match &self.outcome {
            Ok(envelope) => Ok(envelope.clone()),
            Err(failure) => Err(failure.to_error()),
        }
    }
}

/// Video provider for one variant with a scripted submit/poll protocol
pub struct ScriptedVideoProvider {
    variant: String,
    submit_failures: Mutex<VecDeque<ScriptedFailure>>,
    poll_failure: Option<(u32, ScriptedFailure)>,
    polls_until_done: Option<u32>,
    videos: Vec<VideoOutput>,
    hosted: HashMap<String, Vec<u8>>,
    submit_calls: AtomicU32,
    poll_calls: AtomicU32,
    download_calls: AtomicU32,
    requests: Mutex<Vec<VideoRequest>>,
}

impl ScriptedVideoProvider {
    /// Accepts every submission and finishes on the first poll with no videos
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            submit_failures: Mutex::new(VecDeque::new()),
            poll_failure: None,
            polls_until_done: Some(1),
            videos: Vec::new(),
            hosted: HashMap::new(),
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            download_calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next submission; repeat to queue several failures
    pub fn failing_submit(self, failure: ScriptedFailure) -> Self {
        locked(&self.submit_failures).push_back(failure);
        self
    }

    /// Fail the `nth` poll (1-based)
    pub fn failing_poll(mut self, nth: u32, failure: ScriptedFailure) -> Self {
        self.poll_failure = Some((nth, failure));
        self
    }

    /// Report done on the `n`th poll
    pub fn done_after(mut self, polls: u32) -> Self {
        self.polls_until_done = Some(polls);
        self
    }

    /// Never report done
    pub fn never_done(mut self) -> Self {
        self.polls_until_done = None;
        self
    }

    /// Add a video to the finished operation
    pub fn with_video(mut self, video: VideoOutput) -> Self {
        self.videos.push(video);
        self
    }

    /// Finish with inline MP4 bytes
    pub fn with_inline(self, bytes: Vec<u8>) -> Self {
        self.with_video(VideoOutput::Inline(MediaBlob::mp4(bytes)))
    }

    /// Serve `bytes` when `uri` is downloaded
    pub fn hosting(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.hosted.insert(uri.into(), bytes);
        self
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> u32 {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Every accepted or rejected submission so far
    pub fn requests(&self) -> Vec<VideoRequest> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl VideoProvider for ScriptedVideoProvider {
    fn variant(&self) -> &str {
        &self.variant
    }

    async fn submit(&self, request: &VideoRequest) -> Result<OperationHandle, ProviderError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        locked(&self.requests).push(request.clone());
        if let Some(failure) = locked(&self.submit_failures).pop_front() {
            return Err(failure.to_error());
        }
        Ok(OperationHandle(format!(
            "models/{}/operations/{}",
            self.variant, call
        )))
    }

    async fn poll(&self, _handle: &OperationHandle) -> Result<OperationState, ProviderError> {
        let call = self.poll_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((nth, failure)) = &self.poll_failure {
            if *nth == call {
                return Err(failure.to_error());
            }
        }
        match self.polls_until_done {
            Some(target) if call >= target => Ok(OperationState::finished(self.videos.clone())),
            _ => Ok(OperationState::pending()),
        }
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, ProviderError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.hosted.get(uri).cloned().ok_or_else(|| ProviderError::Api {
            status: 404,
            message: format!("{} not found", uri),
        })
    }
}

/// Model listing with a fixed answer
pub struct ScriptedCatalog {
    outcome: Result<Vec<ModelInfo>, ScriptedFailure>,
    list_calls: AtomicU32,
}

impl ScriptedCatalog {
    /// Lists `ids` as `models/<id>`
    pub fn listing(ids: &[&str]) -> Self {
        Self {
            outcome: Ok(ids
                .iter()
                .map(|id| ModelInfo::new(format!("models/{}", id)))
                .collect()),
            list_calls: AtomicU32::new(0),
        }
    }

    pub fn failing(failure: ScriptedFailure) -> Self {
        Self {
            outcome: Err(failure),
            list_calls: AtomicU32::new(0),
        }
    }

    pub fn list_count(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelCatalog for ScriptedCatalog {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(models) => Ok(models.clone()),
            Err(failure) => Err(failure.to_error()),
        }
    }
}

/// Frame extractor that writes a fixed number of numbered frames
pub struct ScriptedExtractor {
    frame_count: usize,
}

impl ScriptedExtractor {
    pub fn new(frame_count: usize) -> Self {
        Self { frame_count }
    }
}

#[async_trait]
impl FrameExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        _input: &Path,
        output_pattern: &Path,
        _sampling_rate_hz: f32,
    ) -> media_tools::Result<()> {
        let dir = output_pattern.parent().unwrap_or_else(|| Path::new("."));
        for n in 1..=self.frame_count {
            let name = format!("frame_{:03}.png", n);
            tokio::fs::write(dir.join(name), format!("frame {}", n)).await?;
        }
        Ok(())
    }
}
