//! Generation orchestrator
//!
//! Runs one node's generation task end to end:
//! 1. mark the node (and its mirrors) in flight
//! 2. resolve inputs from upstream nodes
//! 3. run the task through the gateway, without holding the graph lock
//! 4. store the output and mirror it, or record the error
//!
//! Unrelated nodes can run concurrently; running the same node twice at
//! once is a caller error.

use std::sync::Arc;

use generation::{derive_seed, GenerationGateway, GenerationTask, ResolvedInputs, TaskKind};
use tokio::task::JoinHandle;

use crate::error::{EngineError, Result};
use crate::events::{EventSink, NullEventSink, PipelineEvent};
use crate::resolver::{collect_inputs_with, SelectionPolicy};
use crate::status;
use crate::store::GraphStore;
use crate::types::{Graph, NodeId, NodeStatus};

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The node whose task ran (the upstream source for preview nodes)
    pub node_id: NodeId,
    /// Mirrored preview nodes that received the same output
    pub mirrored: Vec<NodeId>,
}

/// Executes generation tasks against nodes of one graph
#[derive(Clone)]
pub struct Orchestrator {
    store: GraphStore,
    gateway: Arc<GenerationGateway>,
    events: Arc<dyn EventSink>,
    policy: SelectionPolicy,
}

impl Orchestrator {
    pub fn new(store: GraphStore, gateway: Arc<GenerationGateway>) -> Self {
        Self {
            store,
            gateway,
            events: Arc::new(NullEventSink),
            policy: SelectionPolicy::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Run `node_id`'s task as an independent tokio task
    pub fn spawn(&self, node_id: impl Into<NodeId>) -> JoinHandle<Result<RunOutcome>> {
        let orchestrator = self.clone();
        let node_id = node_id.into();
        tokio::spawn(async move { orchestrator.run(&node_id).await })
    }

    /// Run `node_id`'s task and wait for it.
    ///
    /// Executing an AnimationPreview or FramesPreview re-runs the upstream
    /// Animation or Cut it mirrors. On failure the error is both recorded on
    /// the node and returned.
    pub async fn run(&self, node_id: &str) -> Result<RunOutcome> {
        let target = self.store.read(|g| executable_target(g, node_id)).await?;

        let (inputs, changed) = self
            .store
            .update(|g| {
                let changed = status::begin(g, &target)?;
                let inputs = collect_inputs_with(g, &target, self.policy);
                Ok::<_, EngineError>((inputs, changed))
            })
            .await?;
        self.publish_status(&changed, NodeStatus::Generating, None).await;

        let inputs = match inputs {
            Ok(inputs) => inputs,
            Err(err) => return Err(self.record_failure(&target, err).await),
        };

        let task = GenerationTask {
            seed: derive_seed(&target, seed_discriminator(&inputs)),
            target_node_id: target.clone(),
            inputs,
        };
        self.emit(PipelineEvent::TaskStarted {
            node_id: target.clone(),
            task_kind: task.task_kind(),
            seed: task.seed,
        });

        match self.gateway.run(&task).await {
            Ok(output) => {
                let changed = self
                    .store
                    .update(|g| status::complete(g, &target, output))
                    .await;
                let changed = match changed {
                    Ok(changed) => changed,
                    Err(err) => return Err(self.record_failure(&target, err).await),
                };
                self.publish_status(&changed, NodeStatus::Ready, None).await;

                let mirrored = changed.into_iter().skip(1).collect::<Vec<_>>();
                log::info!(
                    "Node {} ready ({} mirrored preview node(s))",
                    target,
                    mirrored.len()
                );
                self.emit(PipelineEvent::TaskCompleted {
                    node_id: target.clone(),
                    mirrored: mirrored.clone(),
                });
                Ok(RunOutcome {
                    node_id: target,
                    mirrored,
                })
            }
            Err(err) => Err(self.record_failure(&target, err.into()).await),
        }
    }

    /// Store `err` on the node and its mirrors and hand it back
    async fn record_failure(&self, node_id: &str, err: EngineError) -> EngineError {
        let message = err.to_string();
        log::error!("Node {} failed: {}", node_id, message);

        match self.store.update(|g| status::fail(g, node_id, &message)).await {
            Ok(changed) => {
                self.publish_status(&changed, NodeStatus::Error, Some(&message))
                    .await
            }
            Err(e) => log::warn!("Could not record failure on {}: {}", node_id, e),
        }
        self.emit(PipelineEvent::TaskFailed {
            node_id: node_id.to_string(),
            error: message,
        });
        err
    }

    /// Emit one status event per changed node, reading the status each node
    /// actually has now
    async fn publish_status(&self, changed: &[NodeId], fallback: NodeStatus, error: Option<&str>) {
        let statuses: Vec<(NodeId, NodeStatus)> = self
            .store
            .read(|g| {
                changed
                    .iter()
                    .map(|id| {
                        let status = g.node(id).map(|n| n.status).unwrap_or(fallback);
                        (id.clone(), status)
                    })
                    .collect()
            })
            .await;
        for (id, status) in statuses {
            self.emit(PipelineEvent::status(&id, status, error));
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.events.send(event) {
            log::debug!("Dropped pipeline event: {}", e);
        }
    }
}

/// The node whose task runs when `node_id` is executed
fn executable_target(graph: &Graph, node_id: &str) -> Result<NodeId> {
    let node = graph
        .node(node_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;
    let kind = node.kind();

    if kind.task_kind().is_some() {
        return Ok(node_id.to_string());
    }

    match kind.mirrored_from() {
        Some(source_kind) => graph
            .upstream(node_id)
            .find(|n| n.kind() == source_kind)
            .map(|n| n.id.clone())
            .ok_or_else(|| {
                EngineError::missing(format!(
                    "{} '{}' has no {} wired into it",
                    kind, node_id, source_kind
                ))
            }),
        None => Err(EngineError::NotExecutable {
            node: node_id.to_string(),
            kind,
        }),
    }
}

/// Seed discriminator: the animation kind for video, the task kind otherwise
fn seed_discriminator(inputs: &ResolvedInputs) -> &'static str {
    match inputs {
        ResolvedInputs::Video { animation, .. } => animation.as_str(),
        ResolvedInputs::Image { .. } => TaskKind::Image.as_str(),
        ResolvedInputs::FrameExtraction { .. } => TaskKind::FrameExtraction.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, Node};
    use generation::AnimationKind;

    #[test]
    fn test_preview_nodes_delegate_upstream() {
        let mut graph = Graph::new();
        graph.insert_node(Node::animation("anim", AnimationKind::Run));
        graph.insert_node(Node::animation_preview("view"));
        graph.insert_node(Node::frames_preview("frames"));
        graph.insert_node(Node::prompt("p", "x"));
        graph.edges.push(Edge::new("e1", "anim", "view"));

        assert_eq!(executable_target(&graph, "anim").unwrap(), "anim");
        assert_eq!(executable_target(&graph, "view").unwrap(), "anim");
        assert!(matches!(
            executable_target(&graph, "frames"),
            Err(EngineError::Generation(_))
        ));
        assert!(matches!(
            executable_target(&graph, "p"),
            Err(EngineError::NotExecutable { .. })
        ));
    }

    #[test]
    fn test_seed_discriminators() {
        let video = ResolvedInputs::Video {
            source: generation::MediaBlob::png(vec![]),
            animation: AnimationKind::Walk,
            extra_prompt: None,
        };
        assert_eq!(seed_discriminator(&video), "walk");
        let image = ResolvedInputs::Image {
            prompt: None,
            references: vec![],
        };
        assert_eq!(seed_discriminator(&image), "image");
    }
}
