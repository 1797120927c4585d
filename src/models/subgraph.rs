//! Subgraph model returned by reasoning queries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Edge, Node};
use crate::error::AppError;

/// A bounded slice of a graph: unique nodes keyed by id plus an ordered
/// edge list.
///
/// On the wire nodes are a plain list; ids must be unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SubgraphRepr", into = "SubgraphRepr")]
pub struct Subgraph {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
}

#[derive(Serialize, Deserialize)]
struct SubgraphRepr {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl TryFrom<SubgraphRepr> for Subgraph {
    type Error = String;

    fn try_from(repr: SubgraphRepr) -> Result<Self, Self::Error> {
        let mut subgraph = Subgraph::new();
        for node in repr.nodes {
            let id = node.id.clone();
            if !subgraph.insert_node(node) {
                return Err(format!("duplicate node id in subgraph: {}", id));
            }
        }
        subgraph.edges = repr.edges;
        Ok(subgraph)
    }
}

impl From<Subgraph> for SubgraphRepr {
    fn from(subgraph: Subgraph) -> Self {
        Self {
            nodes: subgraph.nodes.into_values().collect(),
            edges: subgraph.edges,
        }
    }
}

impl Subgraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a subgraph from parts. Later duplicates of a node id are ignored.
    pub fn from_parts(nodes: impl IntoIterator<Item = Node>, edges: Vec<Edge>) -> Self {
        let mut subgraph = Self::new();
        for node in nodes {
            subgraph.insert_node(node);
        }
        subgraph.edges = edges;
        subgraph
    }

    /// Adds a node unless its id is already present. Returns whether it was added.
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Appends an edge record.
    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges with at least one endpoint missing from `nodes`.
    pub fn dangling_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| {
            !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target)
        })
    }

    /// Drops dangling edges, returning how many were removed.
    pub fn retain_resolved_edges(&mut self) -> usize {
        let before = self.edges.len();
        let nodes = &self.nodes;
        self.edges
            .retain(|edge| nodes.contains_key(&edge.source) && nodes.contains_key(&edge.target));
        before - self.edges.len()
    }

    /// Fails with [`AppError::Internal`] if any edge references an absent node.
    pub fn check_integrity(&self) -> Result<(), AppError> {
        match self.dangling_edges().next() {
            Some(edge) => Err(AppError::Internal(format!(
                "edge {} -[{}]-> {} references a node outside the subgraph",
                edge.source, edge.edge_type, edge.target
            ))),
            None => Ok(()),
        }
    }

    /// Flat node/edge listing used as generation context.
    ///
    /// With a `limit`, only the first `limit` nodes (by id) and the edges
    /// between them are listed.
    pub fn context_listing(&self, limit: Option<usize>) -> String {
        let limit = limit.unwrap_or(usize::MAX);
        let listed: Vec<&Node> = self.nodes.values().take(limit).collect();

        let mut out = String::from("Nodes:\n");
        for node in &listed {
            let pairs = node.properties.render_pairs();
            if pairs.is_empty() {
                out.push_str(&format!("- {} [{}]\n", node.id, node.node_type));
            } else {
                out.push_str(&format!(
                    "- {} [{}] {}\n",
                    node.id,
                    node.node_type,
                    pairs.join(", ")
                ));
            }
        }

        out.push_str("Edges:\n");
        let is_listed = |id: &str| listed.iter().any(|n| n.id == id);
        for edge in &self.edges {
            if is_listed(&edge.source) && is_listed(&edge.target) {
                out.push_str(&format!(
                    "- {} -[{}]-> {}\n",
                    edge.source, edge.edge_type, edge.target
                ));
            }
        }
        out
    }
}
