//! Graph store contract consumed by the reasoning core.
//!
//! The reasoning path only needs lookups ([`GraphStore::search_nodes`],
//! [`GraphStore::get_node`], [`GraphStore::get_node_edges`]); the mutation
//! methods serve ingestion and graph updates.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Edge, Node, VersionMetadata};

/// Node/edge storage for many named graphs.
///
/// Implementations own persistence. Lookups on an unknown graph fail with
/// [`AppError::GraphNotFound`]; transport failures surface as
/// [`AppError::Unavailable`].
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Finds nodes matching a concept string exactly (case-insensitive).
    async fn search_nodes(&self, graph_id: &str, concept: &str) -> Result<Vec<Node>, AppError>;

    /// Fetches one node, or `None` if the graph has no such node.
    async fn get_node(&self, graph_id: &str, node_id: &str) -> Result<Option<Node>, AppError>;

    /// Fetches every edge incident to a node, in either direction.
    async fn get_node_edges(&self, graph_id: &str, node_id: &str) -> Result<Vec<Edge>, AppError>;

    /// Returns true if the graph exists.
    async fn graph_exists(&self, graph_id: &str) -> Result<bool, AppError>;

    /// Creates an empty graph.
    async fn create_graph(&self, graph_id: &str, metadata: &VersionMetadata)
        -> Result<(), AppError>;

    /// Inserts or replaces a node.
    async fn add_node(&self, graph_id: &str, node: Node) -> Result<(), AppError>;

    /// Appends an edge. Both endpoints must already exist.
    async fn add_edge(&self, graph_id: &str, edge: Edge) -> Result<(), AppError>;

    /// Copies a graph's nodes and edges into a new graph.
    async fn clone_graph(&self, source_id: &str, target_id: &str) -> Result<(), AppError>;

    /// Drops a graph with all its nodes and edges.
    async fn remove_graph(&self, graph_id: &str) -> Result<(), AppError>;
}
