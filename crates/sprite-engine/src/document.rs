//! Graph documents on disk
//!
//! A document is the JSON form of [`Graph`]: a node list and an edge list,
//! with binary payloads carried as base64 strings. Only the host reads and
//! writes documents; the engine itself keeps graphs in memory.

use std::path::Path;

use crate::error::Result;
use crate::types::Graph;

/// Read a graph document
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let graph: Graph = serde_json::from_str(&content)?;
    log::info!(
        "Loaded graph with {} node(s) and {} edge(s) from {:?}",
        graph.nodes.len(),
        graph.edges.len(),
        path
    );
    Ok(graph)
}

/// Write a graph document, creating parent directories as needed
pub fn save_graph(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(graph)?;
    std::fs::write(path, content)?;
    log::debug!("Saved graph to {:?}", path);
    Ok(())
}
