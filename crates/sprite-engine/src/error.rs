//! Error types for the sprite engine

use generation::GenerationError;
use media_tools::FrameError;
use thiserror::Error;

use crate::types::NodeKind;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the sprite engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// No node with this id
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node with this id already exists
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// The node kind has nothing to execute
    #[error("Node '{node}' of kind {kind} cannot be executed")]
    NotExecutable { node: String, kind: NodeKind },

    /// An operation expected a different node kind
    #[error("Node '{node}' is {actual}, expected {expected}")]
    KindMismatch {
        node: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    /// The node holds nothing that can be exported
    #[error("Nothing to export from node '{0}'")]
    NothingToExport(String),

    /// Generation task failure
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Frame or archive failure
    #[error("Media error: {0}")]
    Media(#[from] FrameError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a missing dependency error with a message
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::Generation(GenerationError::missing(msg))
    }

    /// The underlying generation error, if any
    pub fn generation(&self) -> Option<&GenerationError> {
        match self {
            Self::Generation(e) => Some(e),
            _ => None,
        }
    }
}
