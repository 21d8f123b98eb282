//! Node status machine
//!
//! `Idle -> Generating|Cutting -> Ready|Error`, with `Ready` and `Error`
//! re-entering the in-flight state on an explicit re-run. Every transition
//! is applied to the executing node and to its mirrored preview nodes (an
//! Animation's AnimationPreviews, a Cut's FramesPreviews) in one call, so a
//! caller holding the graph lock publishes both together.

use generation::TaskOutput;

use crate::error::{EngineError, Result};
use crate::types::{Graph, NodeId, NodeKind, NodePayload, NodeStatus};

/// Mirrored preview nodes of `node_id`: outgoing targets of its mirror kind
pub fn mirror_targets(graph: &Graph, node_id: &str) -> Vec<NodeId> {
    let Some(mirror_kind) = graph.node(node_id).and_then(|n| n.kind().mirror_kind()) else {
        return Vec::new();
    };
    let mut targets: Vec<NodeId> = Vec::new();
    for node in graph.downstream(node_id).filter(|n| n.kind() == mirror_kind) {
        if !targets.contains(&node.id) {
            targets.push(node.id.clone());
        }
    }
    targets
}

fn set_status(graph: &mut Graph, node_id: &str, status: NodeStatus, error: Option<&str>) {
    if let Some(node) = graph.node_mut(node_id) {
        log::debug!("Node {} status {:?} -> {:?}", node_id, node.status, status);
        node.status = status;
        node.error_message = error.map(str::to_string);
    }
}

/// Move `node_id` and its mirrors to the in-flight status for its kind.
///
/// Returns the ids whose status changed, the executing node first.
pub fn begin(graph: &mut Graph, node_id: &str) -> Result<Vec<NodeId>> {
    let node = graph
        .node(node_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;
    if node.status.is_in_flight() {
        log::warn!("Node {} is already {:?}; starting again", node_id, node.status);
    }
    let status = node.kind().in_flight_status();

    let mut changed = vec![node_id.to_string()];
    changed.extend(mirror_targets(graph, node_id));
    for id in &changed {
        set_status(graph, id, status, None);
    }
    Ok(changed)
}

/// Store `output` on `node_id`, mark it Ready and copy the output into its
/// mirrors.
///
/// The output must match the node's kind; on mismatch nothing changes.
pub fn complete(graph: &mut Graph, node_id: &str, output: TaskOutput) -> Result<Vec<NodeId>> {
    let mirrors = mirror_targets(graph, node_id);
    let node = graph
        .node_mut(node_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;

    let mirrored_payload = match (&mut node.payload, output) {
        (NodePayload::Preview { image }, TaskOutput::Image(blob)) => {
            *image = Some(blob);
            None
        }
        (NodePayload::Animation { video, .. }, TaskOutput::Video(blob)) => {
            *video = Some(blob.clone());
            Some(NodePayload::AnimationPreview { video: Some(blob) })
        }
        (
            NodePayload::Cut {
                frames, archive, ..
            },
            TaskOutput::Frames {
                frames: new_frames,
                archive: new_archive,
            },
        ) => {
            *frames = new_frames.clone();
            *archive = new_archive;
            Some(NodePayload::FramesPreview { frames: new_frames })
        }
        (payload, output) => {
            let expected = match output {
                TaskOutput::Image(_) => NodeKind::Preview,
                TaskOutput::Video(_) => NodeKind::Animation,
                TaskOutput::Frames { .. } => NodeKind::Cut,
            };
            return Err(EngineError::KindMismatch {
                node: node_id.to_string(),
                expected,
                actual: payload.kind(),
            });
        }
    };

    let mut changed = vec![node_id.to_string()];
    set_status(graph, node_id, NodeStatus::Ready, None);

    if let Some(payload) = mirrored_payload {
        for id in mirrors {
            if let Some(mirror) = graph.node_mut(&id) {
                mirror.payload = payload.clone();
            }
            set_status(graph, &id, NodeStatus::Ready, None);
            changed.push(id);
        }
    }
    Ok(changed)
}

/// Mark `node_id` and its mirrors as failed with `message`. Payloads are
/// left untouched.
pub fn fail(graph: &mut Graph, node_id: &str, message: &str) -> Result<Vec<NodeId>> {
    if graph.node(node_id).is_none() {
        return Err(EngineError::NodeNotFound(node_id.to_string()));
    }
    let mut changed = vec![node_id.to_string()];
    changed.extend(mirror_targets(graph, node_id));
    for id in &changed {
        set_status(graph, id, NodeStatus::Error, Some(message));
    }
    Ok(changed)
}
