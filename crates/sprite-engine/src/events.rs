//! Pipeline progress events
//!
//! The orchestrator reports each task's start, every node status change
//! (mirrors included) and the final result through an [`EventSink`]. A
//! dropped event never affects the run itself.

use generation::TaskKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{NodeId, NodeStatus};

/// Receiver of the orchestrator's progress events
pub trait EventSink: Send + Sync {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError>;
}

/// Why a sink could not take an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Event receiver has gone away")]
    ReceiverGone,

    #[error("Event buffer is poisoned")]
    BufferPoisoned,
}

/// Events emitted while running generation tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    /// A task started for a node
    #[serde(rename_all = "camelCase")]
    TaskStarted {
        node_id: NodeId,
        task_kind: TaskKind,
        seed: u32,
    },

    /// A node's status changed (including mirrored preview nodes)
    #[serde(rename_all = "camelCase")]
    NodeStatusChanged {
        node_id: NodeId,
        status: NodeStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A task finished and its output was stored
    #[serde(rename_all = "camelCase")]
    TaskCompleted {
        node_id: NodeId,
        mirrored: Vec<NodeId>,
    },

    /// A task failed
    #[serde(rename_all = "camelCase")]
    TaskFailed { node_id: NodeId, error: String },
}

impl PipelineEvent {
    /// Create a status change event
    pub fn status(node_id: &str, status: NodeStatus, error: Option<&str>) -> Self {
        Self::NodeStatusChanged {
            node_id: node_id.to_string(),
            status,
            error: error.map(str::to_string),
        }
    }
}

/// Default sink of an [`Orchestrator`](crate::Orchestrator) with no listener
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: PipelineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Keeps every event in send order
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<PipelineEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| EventError::BufferPoisoned)?;
        events.push(event);
        Ok(())
    }
}

/// Forwards events into an unbounded tokio channel
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::ReceiverGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::status("anim", NodeStatus::Error, Some("Timed out"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nodeStatusChanged");
        assert_eq!(json["nodeId"], "anim");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "Timed out");

        let started = PipelineEvent::TaskStarted {
            node_id: "cut".to_string(),
            task_kind: TaskKind::FrameExtraction,
            seed: 3,
        };
        let json = serde_json::to_value(&started).unwrap();
        assert_eq!(json["taskKind"], "frame_extraction");
    }

    #[test]
    fn test_vec_sink_collects() {
        let sink = VecEventSink::new();
        sink.send(PipelineEvent::status("a", NodeStatus::Ready, None))
            .unwrap();
        assert_eq!(sink.events().len(), 1);
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut receiver) = ChannelEventSink::channel();
        sink.send(PipelineEvent::TaskFailed {
            node_id: "a".to_string(),
            error: "boom".to_string(),
        })
        .unwrap();
        assert!(matches!(
            receiver.recv().await,
            Some(PipelineEvent::TaskFailed { .. })
        ));

        drop(receiver);
        assert_eq!(
            sink.send(PipelineEvent::status("a", NodeStatus::Idle, None)),
            Err(EventError::ReceiverGone)
        );
    }
}
