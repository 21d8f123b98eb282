//! Generation providers for SpriteFlow
//!
//! This crate executes one generation task at a time against external
//! providers:
//! - **Image**: a single `generateContent` call returning a sprite image
//! - **Video**: a fallback chain of Veo variants, each a long-running
//!   operation that is polled until done, with rate-limited variants skipped
//! - **Frame extraction**: the video is cut into frames by the
//!   `media-tools` adapter
//!
//! Every output is normalized to a single [`MediaBlob`] (or frame set), so
//! callers never see provider-specific response shapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use generation::{GenerationConfig, GenerationGateway};
//!
//! let config = GenerationConfig::default().apply_env();
//! let gateway = GenerationGateway::from_config(&config)?;
//! let output = gateway.run(&task).await?;
//! ```

pub mod attempt;
pub mod background;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod output;
pub mod prompts;
pub mod provider;
pub mod scripted;
pub mod seed;
pub mod task;

pub use attempt::{AttemptState, ProviderAttempt};
pub use background::{BackgroundRemover, RemoveBgClient};
pub use config::GenerationConfig;
pub use error::{ErrorKind, GenerationError, ProviderError, Result};
pub use gateway::{GatewaySettings, GenerationGateway};
pub use provider::{
    ImageProvider, ImageRequest, ModelCatalog, ModelInfo, OperationHandle, OperationState,
    ResponseEnvelope, ResponsePart, VideoOutput, VideoProvider, VideoRequest,
};
pub use seed::derive_seed;
pub use task::{AnimationKind, GenerationTask, MediaBlob, ResolvedInputs, TaskKind, TaskOutput};
