//! Sprite graph engine for SpriteFlow
//!
//! This crate owns the node graph a user builds (references and prompts
//! feeding sprite previews, previews feeding animations, animations feeding
//! frame cuts) and drives generation through it:
//!
//! - **GraphStore**: the single writer of a graph's state
//! - **Resolver**: collects a node's task inputs from its upstream nodes
//! - **Status machine**: in-flight, Ready and Error transitions, mirrored
//!   onto paired preview nodes
//! - **Orchestrator**: runs one node's task through the
//!   [`generation::GenerationGateway`] and records the outcome
//! - **ExportAssembler**: zips a Cut's frames for download
//!
//! # Example
//!
//! ```ignore
//! use sprite_engine::{GraphStore, Orchestrator};
//!
//! let store = GraphStore::new(load_graph("knight.json")?);
//! let orchestrator = Orchestrator::new(store, gateway);
//! orchestrator.run("preview-1").await?;
//! ```

pub mod document;
pub mod error;
pub mod events;
pub mod export;
pub mod orchestrator;
pub mod resolver;
pub mod status;
pub mod store;
pub mod types;

pub use document::{load_graph, save_graph};
pub use error::{EngineError, Result};
pub use events::{
    ChannelEventSink, EventError, EventSink, NullEventSink, PipelineEvent, VecEventSink,
};
pub use export::ExportAssembler;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use resolver::{collect_inputs, collect_inputs_with, SelectionPolicy};
pub use store::GraphStore;
pub use types::{Edge, EdgeId, Graph, Node, NodeId, NodeKind, NodePayload, NodeStatus};
