//! Error types for generation
//!
//! Two layers, as with backend and gateway errors elsewhere in the
//! workspace: `ProviderError` is what a single provider call reports, and
//! `GenerationError` is what a whole generation task reports to the node
//! status machine.

use media_tools::FrameError;
use thiserror::Error;

/// Result type alias using GenerationError
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Failure of one call against one provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the call because of quota or request rate
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Network failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// HTTP status used by providers to signal rate limiting
    pub const RATE_LIMIT_STATUS: u16 = 429;

    /// Classify a non-success HTTP response
    pub fn from_status(status: u16, body: String) -> Self {
        if status == Self::RATE_LIMIT_STATUS {
            Self::RateLimited(body)
        } else {
            Self::Api {
                status,
                message: body,
            }
        }
    }

    /// Whether this failure should advance a fallback chain without
    /// counting as an error
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status == Self::RATE_LIMIT_STATUS,
            Self::Http(e) => e
                .status()
                .is_some_and(|s| s.as_u16() == Self::RATE_LIMIT_STATUS),
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Flat classification of a [`GenerationError`], looking through
/// [`GenerationError::ChainExhausted`] wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingDependency,
    RateLimited,
    Timeout,
    NoOutputProduced,
    UnsupportedOutputReference,
    Transport,
    Config,
}

/// Errors that end a generation task
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No qualifying upstream node was wired to the target
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// The provider rate-limited the request
    #[error("Rate limited by {provider}: {message}")]
    RateLimited { provider: String, message: String },

    /// The poll loop ran out of attempts
    #[error("{provider} did not finish after {polls} status checks")]
    Timeout { provider: String, polls: u32 },

    /// The provider finished but returned nothing usable
    #[error("No output produced: {0}")]
    NoOutputProduced(String),

    /// Output is addressed through a scheme we cannot fetch
    #[error("Unsupported output reference: {0}")]
    UnsupportedOutputReference(String),

    /// Network or process failure from a collaborator
    #[error("Transport error: {0}")]
    Transport(String),

    /// Every variant in the fallback chain was tried
    #[error("Video generation failed after trying {attempted} variant(s); last failure from {last_variant}: {source}")]
    ChainExhausted {
        attempted: usize,
        last_variant: String,
        source: Box<GenerationError>,
    },

    /// Missing credentials or an unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Create a missing dependency error with a message
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    /// Attribute a provider failure to the provider that produced it
    pub fn from_provider(provider: &str, err: ProviderError) -> Self {
        if err.is_rate_limited() {
            let message = match err {
                ProviderError::RateLimited(message) => message,
                other => other.to_string(),
            };
            return Self::RateLimited {
                provider: provider.to_string(),
                message,
            };
        }
        Self::Transport(format!("{}: {}", provider, err))
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingDependency(_) => ErrorKind::MissingDependency,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NoOutputProduced(_) => ErrorKind::NoOutputProduced,
            Self::UnsupportedOutputReference(_) => ErrorKind::UnsupportedOutputReference,
            Self::Transport(_) => ErrorKind::Transport,
            Self::ChainExhausted { source, .. } => source.kind(),
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<FrameError> for GenerationError {
    fn from(err: FrameError) -> Self {
        Self::Transport(format!("frame extraction: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ProviderError::from_status(429, "slow down".into()).is_rate_limited());
        assert!(!ProviderError::from_status(500, "boom".into()).is_rate_limited());
        assert!(ProviderError::Api {
            status: 429,
            message: String::new()
        }
        .is_rate_limited());
    }

    #[test]
    fn test_from_provider_keeps_rate_limit() {
        let err = GenerationError::from_provider(
            "veo-a",
            ProviderError::RateLimited("quota".to_string()),
        );
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.to_string(), "Rate limited by veo-a: quota");
    }

    #[test]
    fn test_from_provider_other_is_transport() {
        let err = GenerationError::from_provider(
            "veo-a",
            ProviderError::Api {
                status: 500,
                message: "internal".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("veo-a"));
    }

    #[test]
    fn test_chain_exhausted_message_and_kind() {
        let err = GenerationError::ChainExhausted {
            attempted: 2,
            last_variant: "veo-b".to_string(),
            source: Box::new(GenerationError::RateLimited {
                provider: "veo-b".to_string(),
                message: "quota".to_string(),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        let message = err.to_string();
        assert!(message.contains("2 variant(s)"));
        assert!(message.contains("last failure from veo-b"));
    }
}
