//! Directed, typed edges between nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A directed relationship between two nodes.
///
/// Several edges with the same endpoints and type are legal; each is a
/// separate relationship instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID.
    pub source: String,
    /// Target node ID.
    pub target: String,
    /// Relationship type (e.g. MENTIONS, RELATED_TO).
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Free-form relationship properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonValue>,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            properties: BTreeMap::new(),
        }
    }

    /// True if `node_id` is either endpoint.
    pub fn is_incident(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// The endpoint opposite `node_id`. For self-loops this is `node_id` itself.
    pub fn other_endpoint(&self, node_id: &str) -> &str {
        if self.source == node_id {
            &self.target
        } else {
            &self.source
        }
    }
}
