//! Export assembler
//!
//! Packs the frames held by a Cut or FramesPreview node into a zip archive,
//! optionally removing each frame's background first.

use std::sync::Arc;

use generation::{BackgroundRemover, GenerationError};
use media_tools::{bundle_frames, Frame};

use crate::error::{EngineError, Result};
use crate::types::{Graph, NodeKind};

const BACKGROUND_PROVIDER: &str = "remove.bg";

/// Builds export archives from graph nodes
#[derive(Clone, Default)]
pub struct ExportAssembler {
    background: Option<Arc<dyn BackgroundRemover>>,
}

impl ExportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass every frame through `remover` before bundling
    pub fn with_background_removal(mut self, remover: Arc<dyn BackgroundRemover>) -> Self {
        self.background = Some(remover);
        self
    }

    /// Zip archive of `node_id`'s frames, named by their frame filenames
    pub async fn export_frames(&self, graph: &Graph, node_id: &str) -> Result<Vec<u8>> {
        let node = graph
            .node(node_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;

        match node.kind() {
            NodeKind::Cut | NodeKind::FramesPreview => {}
            actual => {
                return Err(EngineError::KindMismatch {
                    node: node_id.to_string(),
                    expected: NodeKind::Cut,
                    actual,
                })
            }
        }

        let frames = node.payload.frames();
        if frames.is_empty() {
            return Err(EngineError::NothingToExport(node_id.to_string()));
        }

        let archive = match &self.background {
            Some(remover) => bundle_frames(&remove_backgrounds(remover.as_ref(), frames).await?)?,
            None => bundle_frames(frames)?,
        };
        log::info!(
            "Exported {} frame(s) from {} ({} bytes)",
            frames.len(),
            node_id,
            archive.len()
        );
        Ok(archive)
    }
}

async fn remove_backgrounds(remover: &dyn BackgroundRemover, frames: &[Frame]) -> Result<Vec<Frame>> {
    let mut cleaned = Vec::with_capacity(frames.len());
    for frame in frames {
        log::debug!("Removing background from {}", frame.filename);
        let bytes = remover
            .remove_background(&frame.bytes)
            .await
            .map_err(|e| GenerationError::from_provider(BACKGROUND_PROVIDER, e))?;
        cleaned.push(Frame {
            bytes,
            ..frame.clone()
        });
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Node, NodePayload};
    use async_trait::async_trait;
    use generation::{ErrorKind, ProviderError};
    use std::io::{Cursor, Read};

    struct Invert;

    #[async_trait]
    impl BackgroundRemover for Invert {
        async fn remove_background(&self, image: &[u8]) -> std::result::Result<Vec<u8>, ProviderError> {
            Ok(image.iter().map(|b| !b).collect())
        }
    }

    struct Exhausted;

    #[async_trait]
    impl BackgroundRemover for Exhausted {
        async fn remove_background(&self, _image: &[u8]) -> std::result::Result<Vec<u8>, ProviderError> {
            Err(ProviderError::RateLimited("credits used up".to_string()))
        }
    }

    fn graph_with_frames() -> Graph {
        let frames = vec![
            Frame {
                index: 0,
                filename: "frame_001.png".to_string(),
                bytes: vec![0x00],
            },
            Frame {
                index: 1,
                filename: "frame_002.png".to_string(),
                bytes: vec![0x0f],
            },
        ];
        let mut graph = Graph::new();
        graph.insert_node(Node::new("frames", NodePayload::FramesPreview { frames }));
        graph.insert_node(Node::cut("empty-cut"));
        graph.insert_node(Node::prompt("p", "x"));
        graph
    }

    fn entry(archive: &[u8], name: &str) -> Vec<u8> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_export_bundles_frames() {
        let archive = ExportAssembler::new()
            .export_frames(&graph_with_frames(), "frames")
            .await
            .unwrap();
        assert_eq!(entry(&archive, "frame_001.png"), vec![0x00]);
        assert_eq!(entry(&archive, "frame_002.png"), vec![0x0f]);
    }

    #[tokio::test]
    async fn test_export_with_background_removal() {
        let archive = ExportAssembler::new()
            .with_background_removal(Arc::new(Invert))
            .export_frames(&graph_with_frames(), "frames")
            .await
            .unwrap();
        assert_eq!(entry(&archive, "frame_002.png"), vec![0xf0]);
    }

    #[tokio::test]
    async fn test_export_errors() {
        let graph = graph_with_frames();
        let assembler = ExportAssembler::new();
        assert!(matches!(
            assembler.export_frames(&graph, "empty-cut").await,
            Err(EngineError::NothingToExport(_))
        ));
        assert!(matches!(
            assembler.export_frames(&graph, "p").await,
            Err(EngineError::KindMismatch { .. })
        ));
        assert!(matches!(
            assembler.export_frames(&graph, "missing").await,
            Err(EngineError::NodeNotFound(_))
        ));

        let err = ExportAssembler::new()
            .with_background_removal(Arc::new(Exhausted))
            .export_frames(&graph, "frames")
            .await
            .unwrap_err();
        assert_eq!(err.generation().map(|e| e.kind()), Some(ErrorKind::RateLimited));
    }
}
