//! Core types for sprite graphs
//!
//! A graph is a set of nodes keyed by id plus an ordered list of directed
//! edges. Each node carries a kind-specific payload; the kind is the
//! payload's tag, so a node can never hold data for another kind.

use generation::{AnimationKind, MediaBlob, TaskKind};
use media_tools::Frame;
use serde::{Deserialize, Serialize};

/// Unique identifier for a node (caller-assigned)
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// What a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Reference,
    Prompt,
    Preview,
    Animation,
    AnimationPreview,
    Cut,
    FramesPreview,
}

impl NodeKind {
    /// The generation task this kind runs, if it runs one itself
    pub fn task_kind(&self) -> Option<TaskKind> {
        match self {
            Self::Preview => Some(TaskKind::Image),
            Self::Animation => Some(TaskKind::Video),
            Self::Cut => Some(TaskKind::FrameExtraction),
            Self::Reference
            | Self::Prompt
            | Self::AnimationPreview
            | Self::FramesPreview => None,
        }
    }

    /// Status shown while this kind's task is running
    pub fn in_flight_status(&self) -> NodeStatus {
        match self {
            Self::Cut | Self::FramesPreview => NodeStatus::Cutting,
            _ => NodeStatus::Generating,
        }
    }

    /// Downstream kind that displays this kind's output
    pub fn mirror_kind(&self) -> Option<NodeKind> {
        match self {
            Self::Animation => Some(Self::AnimationPreview),
            Self::Cut => Some(Self::FramesPreview),
            _ => None,
        }
    }

    /// Upstream kind whose output this kind displays
    pub fn mirrored_from(&self) -> Option<NodeKind> {
        match self {
            Self::AnimationPreview => Some(Self::Animation),
            Self::FramesPreview => Some(Self::Cut),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Reference => "reference",
            Self::Prompt => "prompt",
            Self::Preview => "preview",
            Self::Animation => "animation",
            Self::AnimationPreview => "animationPreview",
            Self::Cut => "cut",
            Self::FramesPreview => "framesPreview",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Generating,
    Cutting,
    Ready,
    Error,
}

impl NodeStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Generating | Self::Cutting)
    }
}

/// Kind-specific node data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodePayload {
    /// A user-supplied reference image
    Reference {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<MediaBlob>,
    },

    /// Free prompt text
    Prompt {
        #[serde(default)]
        text: String,
    },

    /// A generated sprite image
    Preview {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<MediaBlob>,
    },

    /// Motion settings and the generated video
    #[serde(rename_all = "camelCase")]
    Animation {
        #[serde(default)]
        animation: AnimationKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra_prompt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video: Option<MediaBlob>,
    },

    /// Mirror of an Animation's video
    AnimationPreview {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video: Option<MediaBlob>,
    },

    /// Extracted frames and their zip bundle
    #[serde(rename_all = "camelCase")]
    Cut {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sampling_rate_hz: Option<f32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        frames: Vec<Frame>,
        #[serde(
            default,
            with = "media_tools::base64_bytes",
            skip_serializing_if = "Vec::is_empty"
        )]
        archive: Vec<u8>,
    },

    /// Mirror of a Cut's frames
    FramesPreview {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        frames: Vec<Frame>,
    },
}

impl NodePayload {
    /// Empty payload for a kind
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Reference => Self::Reference { image: None },
            NodeKind::Prompt => Self::Prompt {
                text: String::new(),
            },
            NodeKind::Preview => Self::Preview { image: None },
            NodeKind::Animation => Self::Animation {
                animation: AnimationKind::default(),
                extra_prompt: None,
                video: None,
            },
            NodeKind::AnimationPreview => Self::AnimationPreview { video: None },
            NodeKind::Cut => Self::Cut {
                sampling_rate_hz: None,
                frames: Vec::new(),
                archive: Vec::new(),
            },
            NodeKind::FramesPreview => Self::FramesPreview { frames: Vec::new() },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Reference { .. } => NodeKind::Reference,
            Self::Prompt { .. } => NodeKind::Prompt,
            Self::Preview { .. } => NodeKind::Preview,
            Self::Animation { .. } => NodeKind::Animation,
            Self::AnimationPreview { .. } => NodeKind::AnimationPreview,
            Self::Cut { .. } => NodeKind::Cut,
            Self::FramesPreview { .. } => NodeKind::FramesPreview,
        }
    }

    /// Generated or supplied image, for kinds that hold one
    pub fn image(&self) -> Option<&MediaBlob> {
        match self {
            Self::Reference { image } | Self::Preview { image } => image.as_ref(),
            _ => None,
        }
    }

    /// Generated video, for kinds that hold one
    pub fn video(&self) -> Option<&MediaBlob> {
        match self {
            Self::Animation { video, .. } | Self::AnimationPreview { video } => video.as_ref(),
            _ => None,
        }
    }

    /// Extracted frames, for kinds that hold them
    pub fn frames(&self) -> &[Frame] {
        match self {
            Self::Cut { frames, .. } | Self::FramesPreview { frames } => frames,
            _ => &[],
        }
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub status: NodeStatus,
    pub payload: NodePayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, payload: NodePayload) -> Self {
        Self {
            id: id.into(),
            status: NodeStatus::Idle,
            payload,
            error_message: None,
        }
    }

    pub fn reference(id: impl Into<NodeId>, image: MediaBlob) -> Self {
        Self::new(id, NodePayload::Reference { image: Some(image) })
    }

    pub fn prompt(id: impl Into<NodeId>, text: impl Into<String>) -> Self {
        Self::new(id, NodePayload::Prompt { text: text.into() })
    }

    pub fn preview(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodePayload::empty(NodeKind::Preview))
    }

    pub fn animation(id: impl Into<NodeId>, animation: AnimationKind) -> Self {
        Self::new(
            id,
            NodePayload::Animation {
                animation,
                extra_prompt: None,
                video: None,
            },
        )
    }

    pub fn animation_preview(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodePayload::empty(NodeKind::AnimationPreview))
    }

    pub fn cut(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodePayload::empty(NodeKind::Cut))
    }

    pub fn frames_preview(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodePayload::empty(NodeKind::FramesPreview))
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn is_ready(&self) -> bool {
        self.status == NodeStatus::Ready
    }
}

/// A directed edge from `source` to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A complete sprite graph.
///
/// Nodes keep their insertion order, which is the order "first node" scans
/// see. Edges are not validated: dangling or duplicate edges and cycles are
/// the caller's responsibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(deserialize_with = "unique_nodes")]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Append a node, or replace the node with the same id in place
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        match self.node_mut(&node.id) {
            Some(existing) => Some(std::mem::replace(existing, node)),
            None => {
                self.nodes.push(node);
                None
            }
        }
    }

    /// Remove a node, keeping the order of the rest. Edges are untouched.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        Some(self.nodes.remove(index))
    }

    /// Get edges coming into a node, in edge order
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node, in edge order
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Upstream nodes in edge order; dangling sources are skipped
    pub fn upstream<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.incoming_edges(node_id)
            .filter_map(move |e| self.node(&e.source))
    }

    /// Downstream nodes in edge order; dangling targets are skipped
    pub fn downstream<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.outgoing_edges(node_id)
            .filter_map(move |e| self.node(&e.target))
    }

    /// Nodes with an edge into `node_id`, in node insertion order
    pub fn upstream_in_node_order<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl DoubleEndedIterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| self.incoming_edges(node_id).any(|e| e.source == n.id))
    }
}

fn unique_nodes<'de, D>(deserializer: D) -> Result<Vec<Node>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let nodes = Vec::<Node>::deserialize(deserializer)?;
    for (index, node) in nodes.iter().enumerate() {
        if nodes[..index].iter().any(|n| n.id == node.id) {
            return Err(serde::de::Error::custom(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_matches_tag() {
        for kind in [
            NodeKind::Reference,
            NodeKind::Prompt,
            NodeKind::Preview,
            NodeKind::Animation,
            NodeKind::AnimationPreview,
            NodeKind::Cut,
            NodeKind::FramesPreview,
        ] {
            assert_eq!(NodePayload::empty(kind).kind(), kind);
        }
    }

    #[test]
    fn test_mirror_pairs() {
        assert_eq!(NodeKind::Animation.mirror_kind(), Some(NodeKind::AnimationPreview));
        assert_eq!(NodeKind::Cut.mirror_kind(), Some(NodeKind::FramesPreview));
        assert_eq!(NodeKind::Preview.mirror_kind(), None);
        assert_eq!(NodeKind::FramesPreview.mirrored_from(), Some(NodeKind::Cut));
        assert_eq!(NodeKind::Cut.in_flight_status(), NodeStatus::Cutting);
        assert_eq!(NodeKind::Animation.in_flight_status(), NodeStatus::Generating);
    }

    #[test]
    fn test_edges_in_order() {
        let mut graph = Graph::new();
        graph.insert_node(Node::prompt("p2", "second"));
        graph.insert_node(Node::prompt("p1", "first"));
        graph.insert_node(Node::preview("out"));
        graph.edges.push(Edge::new("e1", "p2", "out"));
        graph.edges.push(Edge::new("e2", "p1", "out"));
        graph.edges.push(Edge::new("e3", "missing", "out"));

        let upstream: Vec<&str> = graph.upstream("out").map(|n| n.id.as_str()).collect();
        assert_eq!(upstream, vec!["p2", "p1"]);
        assert_eq!(graph.incoming_edges("out").count(), 3);
    }

    #[test]
    fn test_nodes_keep_insertion_order() {
        let mut graph = Graph::new();
        graph.insert_node(Node::prompt("zeta", "added first"));
        graph.insert_node(Node::prompt("alpha", "added second"));
        graph.insert_node(Node::preview("out"));
        graph.edges.push(Edge::new("e1", "alpha", "out"));
        graph.edges.push(Edge::new("e2", "zeta", "out"));

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "out"]);

        let in_node_order: Vec<&str> = graph
            .upstream_in_node_order("out")
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(in_node_order, vec!["zeta", "alpha"]);

        assert!(graph.insert_node(Node::prompt("zeta", "edited")).is_some());
        assert_eq!(graph.nodes[0].payload, NodePayload::Prompt { text: "edited".to_string() });

        graph.remove_node("zeta");
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "out"]);
    }

    #[test]
    fn test_document_shape() {
        let mut graph = Graph::new();
        graph.insert_node(Node::reference("ref", MediaBlob::png(vec![1, 2, 3])));
        graph.insert_node(Node::animation("anim", AnimationKind::Walk));
        graph.edges.push(Edge::new("e1", "ref", "anim"));

        let value = serde_json::to_value(&graph).unwrap();
        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);

        let anim = nodes.iter().find(|n| n["id"] == "anim").unwrap();
        assert_eq!(anim["payload"]["kind"], "animation");
        assert_eq!(anim["payload"]["animation"], "walk");
        assert_eq!(anim["status"], "idle");

        let reference = nodes.iter().find(|n| n["id"] == "ref").unwrap();
        assert_eq!(reference["payload"]["image"]["bytes"], "AQID");
        assert_eq!(reference["payload"]["image"]["mimeType"], "image/png");

        let parsed: Graph = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, graph);
    }

    #[test]
    fn test_duplicate_node_ids_rejected() {
        let json = r#"{
            "nodes": [
                { "id": "a", "payload": { "kind": "prompt", "text": "x" } },
                { "id": "a", "payload": { "kind": "prompt", "text": "y" } }
            ]
        }"#;
        assert!(serde_json::from_str::<Graph>(json).is_err());
    }
}
