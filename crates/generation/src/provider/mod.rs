//! Provider abstraction
//!
//! Image providers answer in a single call. Video providers are long-running:
//! a submit returns an operation handle that is polled until done, and the
//! finished operation may hold inline bytes or a reference to hosted output.
//! The gateway only talks to these traits, so tests substitute scripted
//! providers for the HTTP ones.

pub mod gemini;
pub mod veo;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::task::MediaBlob;

pub use gemini::{GeminiImageProvider, GeminiModelCatalog};
pub use veo::VeoVideoProvider;

/// One image generation request
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub references: Vec<MediaBlob>,
    /// Advisory; providers without seeding ignore it
    pub seed: u32,
    pub temperature: Option<f32>,
    /// Model to use instead of the provider's configured one
    pub model: Option<String>,
}

/// A part of an image provider's response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    Image(MediaBlob),
}

/// Ordered parts returned by an image provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEnvelope {
    pub parts: Vec<ResponsePart>,
}

impl ResponseEnvelope {
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self { parts }
    }

    /// First image part; later images are ignored
    pub fn first_image(&self) -> Option<&MediaBlob> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::Image(blob) => Some(blob),
            ResponsePart::Text(_) => None,
        })
    }

    /// First text part, used as a diagnostic when no image was returned
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::Text(text) => Some(text.as_str()),
            ResponsePart::Image(_) => None,
        })
    }
}

/// One video generation submission
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub image: MediaBlob,
    pub seed: u32,
    pub duration_secs: u32,
    pub aspect_ratio: String,
}

/// Opaque identifier of a long-running provider operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(pub String);

impl OperationHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A produced video as the provider reports it
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutput {
    /// Bytes embedded in the operation result
    Inline(MediaBlob),
    /// A URI to fetch the bytes from
    Reference {
        uri: String,
        mime_type: Option<String>,
    },
}

/// Status of a long-running operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationState {
    pub done: bool,
    /// Produced videos, meaningful once `done` is set
    pub videos: Vec<VideoOutput>,
}

impl OperationState {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn finished(videos: Vec<VideoOutput>) -> Self {
        Self { done: true, videos }
    }
}

/// A model advertised by the provider's model listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Resource name, e.g. `models/veo-2-generate-preview`
    pub name: String,
    pub display_name: Option<String>,
    pub supported_methods: Vec<String>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            supported_methods: Vec::new(),
        }
    }

    /// Model id without the `models/` prefix, as used in request paths
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }
}

/// Lists the models available to the configured credentials
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;
}

/// Synchronous image generation
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Identifier used in logs and errors
    fn id(&self) -> &str;

    async fn generate(&self, request: &ImageRequest) -> Result<ResponseEnvelope, ProviderError>;
}

/// Long-running video generation for one model variant
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Model variant this provider submits to
    fn variant(&self) -> &str;

    async fn submit(&self, request: &VideoRequest) -> Result<OperationHandle, ProviderError>;

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationState, ProviderError>;

    /// Whether `uri` points at storage this provider can download from
    fn is_hosted_reference(&self, uri: &str) -> bool {
        uri.starts_with("https://") || uri.starts_with("http://")
    }

    /// Fetch a hosted output reference
    async fn download(&self, uri: &str) -> Result<Vec<u8>, ProviderError>;
}
