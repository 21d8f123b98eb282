//! Generation task types
//!
//! A `GenerationTask` is built fresh for every execution from the inputs the
//! dependency resolver collected; it is never stored.

use media_tools::Frame;
use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Binary media with its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    /// MIME type, e.g. `image/png` or `video/mp4`
    pub mime_type: String,
    /// Raw bytes (base64 in documents)
    #[serde(with = "media_tools::base64_bytes")]
    pub bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// PNG image bytes
    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(defaults::IMAGE_MIME_TYPE, bytes)
    }

    /// MP4 video bytes
    pub fn mp4(bytes: Vec<u8>) -> Self {
        Self::new(defaults::VIDEO_MIME_TYPE, bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The kind of work a generation task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Single synchronous image provider call
    Image,
    /// Fallback chain of video providers with polling
    Video,
    /// External frame-extraction process
    FrameExtraction,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::FrameExtraction => "frames",
        }
    }
}

impl AsRef<str> for TaskKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Motion requested from the video provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    Idle,
    Walk,
    Run,
    Jump,
}

impl AnimationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Run => "run",
            Self::Jump => "jump",
        }
    }
}

impl AsRef<str> for AnimationKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Inputs collected from a node's upstream neighbours, per task kind
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInputs {
    /// Prompt text (first upstream prompt) plus every reference image
    Image {
        prompt: Option<String>,
        references: Vec<MediaBlob>,
    },
    /// The source sprite image plus the target's own motion settings
    Video {
        source: MediaBlob,
        animation: AnimationKind,
        extra_prompt: Option<String>,
    },
    /// The video to cut, with an optional per-node sampling rate
    FrameExtraction {
        video: MediaBlob,
        sampling_rate_hz: Option<f32>,
    },
}

impl ResolvedInputs {
    pub fn task_kind(&self) -> TaskKind {
        match self {
            Self::Image { .. } => TaskKind::Image,
            Self::Video { .. } => TaskKind::Video,
            Self::FrameExtraction { .. } => TaskKind::FrameExtraction,
        }
    }
}

/// One generation invocation against one target node
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub target_node_id: String,
    pub inputs: ResolvedInputs,
    /// Advisory seed for providers that support reproducible sampling
    pub seed: u32,
}

impl GenerationTask {
    pub fn task_kind(&self) -> TaskKind {
        self.inputs.task_kind()
    }
}

/// Normalized result of a generation task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Image(MediaBlob),
    Video(MediaBlob),
    Frames { frames: Vec<Frame>, archive: Vec<u8> },
}
