//! Dependency resolution
//!
//! Collects a node's task inputs from its upstream neighbours. The prompt of
//! an image task is chosen in node insertion order; every other scan runs
//! over incoming edges in edge order. When a task needs exactly one input of
//! a kind and several are wired, [`SelectionPolicy`] decides which one wins.

use generation::{MediaBlob, ResolvedInputs};

use crate::error::{EngineError, Result};
use crate::types::{Graph, Node, NodeKind, NodePayload};

/// Which candidate a single-input selection picks when several qualify
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// First qualifying node in scan order
    #[default]
    First,
    /// Last qualifying node in scan order
    Last,
}

impl SelectionPolicy {
    pub fn select<'a>(&self, mut candidates: impl DoubleEndedIterator<Item = &'a Node>) -> Option<&'a Node> {
        match self {
            Self::First => candidates.next(),
            Self::Last => candidates.next_back(),
        }
    }
}

/// Collect the inputs for `target_id` using the default selection policy
pub fn collect_inputs(graph: &Graph, target_id: &str) -> Result<ResolvedInputs> {
    collect_inputs_with(graph, target_id, SelectionPolicy::default())
}

/// Collect the inputs for `target_id`.
///
/// Image inputs never fail: with nothing wired the result is simply empty.
/// Video and frame-extraction inputs fail with a missing dependency when no
/// qualifying upstream node holds ready output.
pub fn collect_inputs_with(
    graph: &Graph,
    target_id: &str,
    policy: SelectionPolicy,
) -> Result<ResolvedInputs> {
    let target = graph
        .node(target_id)
        .ok_or_else(|| EngineError::NodeNotFound(target_id.to_string()))?;

    let upstream: Vec<&Node> = graph.upstream(target_id).collect();

    match &target.payload {
        NodePayload::Preview { .. } => Ok(image_inputs(graph, target_id, &upstream, policy)),
        NodePayload::Animation {
            animation,
            extra_prompt,
            ..
        } => {
            let preview = policy
                .select(upstream.iter().copied().filter(|n| {
                    n.kind() == NodeKind::Preview && n.is_ready() && n.payload.image().is_some()
                }))
                .ok_or_else(|| {
                    EngineError::missing(format!(
                        "Animation '{}' needs a ready Preview node wired into it",
                        target_id
                    ))
                })?;
            let source = preview.payload.image().cloned().ok_or_else(|| {
                EngineError::missing(format!("Preview '{}' has no image", preview.id))
            })?;
            Ok(ResolvedInputs::Video {
                source,
                animation: *animation,
                extra_prompt: extra_prompt.clone(),
            })
        }
        NodePayload::Cut {
            sampling_rate_hz, ..
        } => {
            let with_video = |kind: NodeKind| {
                policy.select(upstream.iter().copied().filter(move |n| {
                    n.kind() == kind && n.is_ready() && n.payload.video().is_some()
                }))
            };
            let source = with_video(NodeKind::Animation)
                .or_else(|| with_video(NodeKind::AnimationPreview))
                .ok_or_else(|| {
                    EngineError::missing(format!(
                        "Cut '{}' needs a ready Animation or Animation Preview node wired into it",
                        target_id
                    ))
                })?;
            let video = source.payload.video().cloned().ok_or_else(|| {
                EngineError::missing(format!("'{}' has no video", source.id))
            })?;
            Ok(ResolvedInputs::FrameExtraction {
                video,
                sampling_rate_hz: *sampling_rate_hz,
            })
        }
        NodePayload::Reference { .. }
        | NodePayload::Prompt { .. }
        | NodePayload::AnimationPreview { .. }
        | NodePayload::FramesPreview { .. } => Err(EngineError::NotExecutable {
            node: target_id.to_string(),
            kind: target.kind(),
        }),
    }
}

/// Prompt from the selected upstream Prompt node in node order; references
/// from every upstream Reference, then every ready upstream Preview, in edge
/// order
fn image_inputs(
    graph: &Graph,
    target_id: &str,
    upstream: &[&Node],
    policy: SelectionPolicy,
) -> ResolvedInputs {
    let prompt = policy
        .select(
            graph
                .upstream_in_node_order(target_id)
                .filter(|n| n.kind() == NodeKind::Prompt),
        )
        .and_then(|n| match &n.payload {
            NodePayload::Prompt { text } => Some(text.clone()),
            _ => None,
        });

    let mut references: Vec<MediaBlob> = upstream
        .iter()
        .filter(|n| n.kind() == NodeKind::Reference)
        .filter_map(|n| n.payload.image().cloned())
        .collect();

    references.extend(
        upstream
            .iter()
            .filter(|n| n.kind() == NodeKind::Preview && n.is_ready())
            .filter_map(|n| n.payload.image().cloned()),
    );

    ResolvedInputs::Image { prompt, references }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, NodeStatus};
    use generation::{AnimationKind, ErrorKind};

    fn wire(graph: &mut Graph, source: &str, target: &str) {
        let id = format!("{}->{}", source, target);
        graph.edges.push(Edge::new(id, source, target));
    }

    fn ready(mut node: Node) -> Node {
        node.status = NodeStatus::Ready;
        node
    }

    fn ready_preview(id: &str, byte: u8) -> Node {
        let mut node = Node::preview(id);
        node.payload = NodePayload::Preview {
            image: Some(MediaBlob::png(vec![byte])),
        };
        ready(node)
    }

    fn ready_animation(id: &str, byte: u8) -> Node {
        let mut node = Node::animation(id, AnimationKind::Idle);
        if let NodePayload::Animation { video, .. } = &mut node.payload {
            *video = Some(MediaBlob::mp4(vec![byte]));
        }
        ready(node)
    }

    fn missing_kind(result: Result<ResolvedInputs>) -> bool {
        matches!(
            result,
            Err(EngineError::Generation(ref e)) if e.kind() == ErrorKind::MissingDependency
        )
    }

    #[test]
    fn test_image_with_nothing_wired_is_empty() {
        let mut graph = Graph::new();
        graph.insert_node(Node::preview("out"));

        let inputs = collect_inputs(&graph, "out").unwrap();
        assert_eq!(
            inputs,
            ResolvedInputs::Image {
                prompt: None,
                references: vec![]
            }
        );
    }

    #[test]
    fn test_image_prompt_follows_node_order_not_edge_order() {
        let mut graph = Graph::new();
        graph.insert_node(Node::prompt("zeta", "added first"));
        graph.insert_node(Node::prompt("alpha", "added second"));
        graph.insert_node(Node::prompt("loose", "not wired"));
        graph.insert_node(Node::preview("out"));
        wire(&mut graph, "alpha", "out");
        wire(&mut graph, "zeta", "out");

        match collect_inputs(&graph, "out").unwrap() {
            ResolvedInputs::Image { prompt, .. } => {
                assert_eq!(prompt.as_deref(), Some("added first"))
            }
            other => panic!("unexpected inputs: {:?}", other),
        }

        match collect_inputs_with(&graph, "out", SelectionPolicy::Last).unwrap() {
            ResolvedInputs::Image { prompt, .. } => {
                assert_eq!(prompt.as_deref(), Some("added second"))
            }
            other => panic!("unexpected inputs: {:?}", other),
        }
    }

    #[test]
    fn test_image_references_then_ready_previews() {
        let mut graph = Graph::new();
        graph.insert_node(ready_preview("earlier", 9));
        graph.insert_node(Node::preview("pending"));
        graph.insert_node(Node::reference("r1", MediaBlob::png(vec![1])));
        graph.insert_node(Node::reference("r2", MediaBlob::new("image/jpeg", vec![2])));
        graph.insert_node(Node::new("empty-ref", NodePayload::Reference { image: None }));
        graph.insert_node(Node::preview("out"));
        wire(&mut graph, "earlier", "out");
        wire(&mut graph, "r1", "out");
        wire(&mut graph, "pending", "out");
        wire(&mut graph, "empty-ref", "out");
        wire(&mut graph, "r2", "out");

        match collect_inputs(&graph, "out").unwrap() {
            ResolvedInputs::Image { prompt, references } => {
                assert!(prompt.is_none());
                let bytes: Vec<u8> = references.iter().map(|r| r.bytes[0]).collect();
                assert_eq!(bytes, vec![1, 2, 9]);
                assert_eq!(references[1].mime_type, "image/jpeg");
            }
            other => panic!("unexpected inputs: {:?}", other),
        }
    }

    #[test]
    fn test_video_requires_ready_preview() {
        let mut graph = Graph::new();
        graph.insert_node(Node::preview("preview"));
        graph.insert_node(Node::animation("anim", AnimationKind::Walk));
        wire(&mut graph, "preview", "anim");

        assert!(missing_kind(collect_inputs(&graph, "anim")));
    }

    #[test]
    fn test_video_uses_first_ready_preview_and_own_settings() {
        let mut graph = Graph::new();
        graph.insert_node(ready_preview("p1", 1));
        graph.insert_node(ready_preview("p2", 2));
        let mut anim = Node::animation("anim", AnimationKind::Jump);
        if let NodePayload::Animation { extra_prompt, .. } = &mut anim.payload {
            *extra_prompt = Some("higher".to_string());
        }
        graph.insert_node(anim);
        wire(&mut graph, "p2", "anim");
        wire(&mut graph, "p1", "anim");

        assert_eq!(
            collect_inputs(&graph, "anim").unwrap(),
            ResolvedInputs::Video {
                source: MediaBlob::png(vec![2]),
                animation: AnimationKind::Jump,
                extra_prompt: Some("higher".to_string()),
            }
        );
    }

    #[test]
    fn test_cut_prefers_animation_over_preview() {
        let mut graph = Graph::new();
        let mut mirror = Node::animation_preview("mirror");
        mirror.payload = NodePayload::AnimationPreview {
            video: Some(MediaBlob::mp4(vec![7])),
        };
        graph.insert_node(ready(mirror));
        graph.insert_node(ready_animation("anim", 3));
        graph.insert_node(Node::cut("cut"));
        wire(&mut graph, "mirror", "cut");
        wire(&mut graph, "anim", "cut");

        match collect_inputs(&graph, "cut").unwrap() {
            ResolvedInputs::FrameExtraction { video, sampling_rate_hz } => {
                assert_eq!(video.bytes, vec![3]);
                assert_eq!(sampling_rate_hz, None);
            }
            other => panic!("unexpected inputs: {:?}", other),
        }
    }

    #[test]
    fn test_cut_falls_back_to_animation_preview() {
        let mut graph = Graph::new();
        let mut mirror = Node::animation_preview("mirror");
        mirror.payload = NodePayload::AnimationPreview {
            video: Some(MediaBlob::mp4(vec![7])),
        };
        graph.insert_node(ready(mirror));
        graph.insert_node(Node::animation("idle-anim", AnimationKind::Idle));
        graph.insert_node(Node::cut("cut"));
        wire(&mut graph, "idle-anim", "cut");
        wire(&mut graph, "mirror", "cut");

        match collect_inputs(&graph, "cut").unwrap() {
            ResolvedInputs::FrameExtraction { video, .. } => assert_eq!(video.bytes, vec![7]),
            other => panic!("unexpected inputs: {:?}", other),
        }
    }

    #[test]
    fn test_cut_without_video_is_missing() {
        let mut graph = Graph::new();
        graph.insert_node(Node::cut("cut"));
        assert!(missing_kind(collect_inputs(&graph, "cut")));
    }

    #[test]
    fn test_non_executable_kinds() {
        let mut graph = Graph::new();
        graph.insert_node(Node::prompt("p", "x"));
        assert!(matches!(
            collect_inputs(&graph, "p"),
            Err(EngineError::NotExecutable { .. })
        ));
        assert!(matches!(
            collect_inputs(&graph, "nope"),
            Err(EngineError::NodeNotFound(_))
        ));
    }
}
