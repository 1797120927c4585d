//! In-process graph store backed by tokio locks.
//!
//! Graphs live in memory and can be loaded from or written to a JSON
//! snapshot:
//!
//! ```json
//! {"graphs": {"g1": {"nodes": [...], "edges": [...]}}}
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::graph::traits::GraphStore;
use crate::models::{Edge, Node, VersionMetadata};

/// Serialized form of one graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub metadata: VersionMetadata,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Serialized form of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub graphs: BTreeMap<String, GraphSnapshot>,
}

#[derive(Debug, Clone, Default)]
struct MemoryGraph {
    metadata: VersionMetadata,
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
}

impl MemoryGraph {
    fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self {
            metadata: snapshot.metadata,
            nodes: snapshot
                .nodes
                .into_iter()
                .map(|node| (node.id.clone(), node))
                .collect(),
            edges: snapshot.edges,
        }
    }

    fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            metadata: self.metadata.clone(),
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.clone(),
        }
    }
}

/// Graph store holding every graph in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graphs: RwLock<HashMap<String, MemoryGraph>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let graphs = snapshot
            .graphs
            .into_iter()
            .map(|(id, graph)| (id, MemoryGraph::from_snapshot(graph)))
            .collect();
        Self {
            graphs: RwLock::new(graphs),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let graphs = self.graphs.read().await;
        StoreSnapshot {
            graphs: graphs
                .iter()
                .map(|(id, graph)| (id.clone(), graph.to_snapshot()))
                .collect(),
        }
    }

    /// Loads a store from a JSON snapshot file.
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = tokio::fs::read(path.as_ref()).await?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&raw)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            graphs = snapshot.graphs.len(),
            "Loaded graph snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the store to a JSON snapshot file.
    pub async fn write_snapshot(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let snapshot = self.snapshot().await;
        let raw = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(path.as_ref(), raw).await?;
        Ok(())
    }

    /// Exact id match, or an exact whitespace token (surrounding punctuation
    /// trimmed) of any string property, typed or free-form.
    fn matches_concept(node: &Node, concept: &str) -> bool {
        if node.id.to_lowercase() == concept {
            return true;
        }
        let properties = &node.properties;
        properties
            .source
            .iter()
            .chain(properties.timestamp.iter())
            .map(String::as_str)
            .chain(properties.extra.values().filter_map(|value| value.as_str()))
            .flat_map(str::split_whitespace)
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
            .any(|token| !token.is_empty() && token.to_lowercase() == concept)
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn search_nodes(&self, graph_id: &str, concept: &str) -> Result<Vec<Node>, AppError> {
        let concept = concept.trim().to_lowercase();
        let graphs = self.graphs.read().await;
        let graph = graphs
            .get(graph_id)
            .ok_or_else(|| AppError::GraphNotFound(graph_id.to_string()))?;

        if concept.is_empty() {
            return Ok(Vec::new());
        }

        Ok(graph
            .nodes
            .values()
            .filter(|node| Self::matches_concept(node, &concept))
            .cloned()
            .collect())
    }

    async fn get_node(&self, graph_id: &str, node_id: &str) -> Result<Option<Node>, AppError> {
        let graphs = self.graphs.read().await;
        let graph = graphs
            .get(graph_id)
            .ok_or_else(|| AppError::GraphNotFound(graph_id.to_string()))?;
        Ok(graph.nodes.get(node_id).cloned())
    }

    async fn get_node_edges(&self, graph_id: &str, node_id: &str) -> Result<Vec<Edge>, AppError> {
        let graphs = self.graphs.read().await;
        let graph = graphs
            .get(graph_id)
            .ok_or_else(|| AppError::GraphNotFound(graph_id.to_string()))?;
        Ok(graph
            .edges
            .iter()
            .filter(|edge| edge.is_incident(node_id))
            .cloned()
            .collect())
    }

    async fn graph_exists(&self, graph_id: &str) -> Result<bool, AppError> {
        Ok(self.graphs.read().await.contains_key(graph_id))
    }

    async fn create_graph(
        &self,
        graph_id: &str,
        metadata: &VersionMetadata,
    ) -> Result<(), AppError> {
        let mut graphs = self.graphs.write().await;
        if graphs.contains_key(graph_id) {
            return Err(AppError::InvalidArgument(format!(
                "graph already exists: {}",
                graph_id
            )));
        }
        graphs.insert(
            graph_id.to_string(),
            MemoryGraph {
                metadata: metadata.clone(),
                ..MemoryGraph::default()
            },
        );
        Ok(())
    }

    async fn add_node(&self, graph_id: &str, node: Node) -> Result<(), AppError> {
        let mut graphs = self.graphs.write().await;
        let graph = graphs
            .get_mut(graph_id)
            .ok_or_else(|| AppError::GraphNotFound(graph_id.to_string()))?;
        graph.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    async fn add_edge(&self, graph_id: &str, edge: Edge) -> Result<(), AppError> {
        let mut graphs = self.graphs.write().await;
        let graph = graphs
            .get_mut(graph_id)
            .ok_or_else(|| AppError::GraphNotFound(graph_id.to_string()))?;

        for endpoint in [&edge.source, &edge.target] {
            if !graph.nodes.contains_key(endpoint) {
                return Err(AppError::NodeNotFound {
                    graph_id: graph_id.to_string(),
                    node_id: endpoint.clone(),
                });
            }
        }
        graph.edges.push(edge);
        Ok(())
    }

    async fn clone_graph(&self, source_id: &str, target_id: &str) -> Result<(), AppError> {
        let mut graphs = self.graphs.write().await;
        if graphs.contains_key(target_id) {
            return Err(AppError::InvalidArgument(format!(
                "graph already exists: {}",
                target_id
            )));
        }
        let copy = graphs
            .get(source_id)
            .cloned()
            .ok_or_else(|| AppError::GraphNotFound(source_id.to_string()))?;
        graphs.insert(target_id.to_string(), copy);
        Ok(())
    }

    async fn remove_graph(&self, graph_id: &str) -> Result<(), AppError> {
        self.graphs
            .write()
            .await
            .remove(graph_id)
            .map(|_| ())
            .ok_or_else(|| AppError::GraphNotFound(graph_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_graph("g1", &VersionMetadata::new()).await.unwrap();
        store
            .add_node("g1", Node::new("rust", "Concept").with_property("name", "Rust"))
            .await
            .unwrap();
        store
            .add_node(
                "g1",
                Node::new("doc-1", "Document").with_property("title", "The Rust Book"),
            )
            .await
            .unwrap();
        store
            .add_node("g1", Node::new("doc-2", "Document").with_property("title", "Trusty"))
            .await
            .unwrap();
        store
            .add_edge("g1", Edge::new("doc-1", "rust", "MENTIONS"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_is_exact_token_match() {
        let store = seeded().await;
        let found = store.search_nodes("g1", "RUST").await.unwrap();
        let ids: Vec<_> = found.iter().map(|n| n.id.as_str()).collect();
        // "Trusty" contains "rust" but is not an exact token match.
        assert_eq!(ids, vec!["doc-1", "rust"]);
    }

    #[tokio::test]
    async fn test_search_covers_typed_properties_and_whitespace_tokens() {
        let store = seeded().await;
        store
            .add_node(
                "g1",
                Node::new("doc-3", "Document")
                    .with_source("Handbook")
                    .with_property("title", "error-handling (guide)"),
            )
            .await
            .unwrap();

        let by_source = store.search_nodes("g1", "handbook").await.unwrap();
        assert_eq!(by_source.len(), 1);
        assert_eq!(by_source[0].id, "doc-3");

        // Hyphenated words are one token; parentheses are trimmed.
        assert!(store.search_nodes("g1", "error").await.unwrap().is_empty());
        assert_eq!(store.search_nodes("g1", "error-handling").await.unwrap().len(), 1);
        assert_eq!(store.search_nodes("g1", "guide").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_graph_is_not_found() {
        let store = seeded().await;
        assert!(matches!(
            store.search_nodes("nope", "rust").await,
            Err(AppError::GraphNotFound(_))
        ));
        assert!(matches!(
            store.get_node("nope", "rust").await,
            Err(AppError::GraphNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_node_edges_both_directions() {
        let store = seeded().await;
        assert_eq!(store.get_node_edges("g1", "rust").await.unwrap().len(), 1);
        assert_eq!(store.get_node_edges("g1", "doc-1").await.unwrap().len(), 1);
        assert!(store.get_node_edges("g1", "doc-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_edge_requires_endpoints() {
        let store = seeded().await;
        let result = store.add_edge("g1", Edge::new("rust", "ghost", "RELATED_TO")).await;
        assert!(matches!(result, Err(AppError::NodeNotFound { .. })));
    }

    #[tokio::test]
    async fn test_clone_graph_is_independent() {
        let store = seeded().await;
        store.clone_graph("g1", "g1_v2").await.unwrap();
        store
            .add_node("g1_v2", Node::new("extra", "Concept"))
            .await
            .unwrap();

        assert!(store.get_node("g1", "extra").await.unwrap().is_none());
        assert!(store.get_node("g1_v2", "extra").await.unwrap().is_some());
        assert!(store.clone_graph("g1", "g1_v2").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_graph() {
        let store = seeded().await;
        store.remove_graph("g1").await.unwrap();
        assert!(!store.graph_exists("g1").await.unwrap());
        assert!(matches!(
            store.remove_graph("g1").await,
            Err(AppError::GraphNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let store = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        store.write_snapshot(&path).await.unwrap();
        let loaded = MemoryStore::load_snapshot(&path).await.unwrap();

        assert!(loaded.graph_exists("g1").await.unwrap());
        assert_eq!(loaded.get_node_edges("g1", "rust").await.unwrap().len(), 1);
    }
}
