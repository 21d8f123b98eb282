//! Shared graph store
//!
//! The single owner of a graph's mutable state. Every mutation takes the
//! store's lock for the duration of one synchronous closure, so node and
//! edge updates (including mirrored status changes) are never interleaved.
//! The lock is never held across an await on a provider.

use std::sync::Arc;

use generation::{AnimationKind, MediaBlob};
use tokio::sync::Mutex;

use crate::error::{EngineError, Result};
use crate::types::{Edge, EdgeId, Graph, Node, NodeKind, NodePayload};

/// Cloneable handle to one graph instance
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graph: Arc<Mutex<Graph>>,
}

impl GraphStore {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Arc::new(Mutex::new(graph)),
        }
    }

    /// Run `f` with exclusive access to the graph
    pub async fn update<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let mut graph = self.graph.lock().await;
        f(&mut graph)
    }

    /// Run `f` against the graph without modifying it
    pub async fn read<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        let graph = self.graph.lock().await;
        f(&graph)
    }

    /// Copy of the whole graph
    pub async fn snapshot(&self) -> Graph {
        self.read(Graph::clone).await
    }

    pub async fn node(&self, id: &str) -> Option<Node> {
        self.read(|g| g.node(id).cloned()).await
    }

    pub async fn add_node(&self, node: Node) -> Result<()> {
        self.update(|g| {
            if g.contains_node(&node.id) {
                return Err(EngineError::DuplicateNode(node.id.clone()));
            }
            log::debug!("Added {} node {}", node.kind(), node.id);
            g.insert_node(node);
            Ok(())
        })
        .await
    }

    /// Remove a node and every edge touching it
    pub async fn remove_node(&self, id: &str) -> Result<Node> {
        self.update(|g| {
            let node = g
                .remove_node(id)
                .ok_or_else(|| EngineError::NodeNotFound(id.to_string()))?;
            g.edges.retain(|e| e.source != id && e.target != id);
            Ok(node)
        })
        .await
    }

    /// Add an edge from `source` to `target` with a fresh id.
    ///
    /// Endpoints are not validated and duplicates are kept.
    pub async fn connect(&self, source: &str, target: &str) -> EdgeId {
        let edge = Edge::new(uuid::Uuid::new_v4().to_string(), source, target);
        let id = edge.id.clone();
        self.add_edge(edge).await;
        id
    }

    pub async fn add_edge(&self, edge: Edge) {
        self.update(|g| g.edges.push(edge)).await
    }

    pub async fn remove_edge(&self, id: &str) -> Option<Edge> {
        self.update(|g| {
            let index = g.edges.iter().position(|e| e.id == id)?;
            Some(g.edges.remove(index))
        })
        .await
    }

    pub async fn set_prompt(&self, id: &str, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.edit_payload(id, NodeKind::Prompt, |payload| {
            if let NodePayload::Prompt { text: current } = payload {
                *current = text;
            }
        })
        .await
    }

    pub async fn set_reference(&self, id: &str, image: MediaBlob) -> Result<()> {
        self.edit_payload(id, NodeKind::Reference, |payload| {
            if let NodePayload::Reference { image: current } = payload {
                *current = Some(image);
            }
        })
        .await
    }

    pub async fn set_animation(
        &self,
        id: &str,
        animation: AnimationKind,
        extra_prompt: Option<String>,
    ) -> Result<()> {
        self.edit_payload(id, NodeKind::Animation, |payload| {
            if let NodePayload::Animation {
                animation: current_kind,
                extra_prompt: current_extra,
                ..
            } = payload
            {
                *current_kind = animation;
                *current_extra = extra_prompt;
            }
        })
        .await
    }

    pub async fn set_sampling_rate(&self, id: &str, rate_hz: Option<f32>) -> Result<()> {
        self.edit_payload(id, NodeKind::Cut, |payload| {
            if let NodePayload::Cut {
                sampling_rate_hz, ..
            } = payload
            {
                *sampling_rate_hz = rate_hz;
            }
        })
        .await
    }

    async fn edit_payload(
        &self,
        id: &str,
        expected: NodeKind,
        edit: impl FnOnce(&mut NodePayload),
    ) -> Result<()> {
        self.update(|g| {
            let node = g
                .node_mut(id)
                .ok_or_else(|| EngineError::NodeNotFound(id.to_string()))?;
            if node.kind() != expected {
                return Err(EngineError::KindMismatch {
                    node: id.to_string(),
                    expected,
                    actual: node.kind(),
                });
            }
            edit(&mut node.payload);
            Ok(())
        })
        .await
    }
}
