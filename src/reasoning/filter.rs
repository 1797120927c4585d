//! Seed-node filtering applied before expansion.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::Node;

/// Caller-supplied filter criteria. Absent fields do not filter.
///
/// Unrecognized keys in the JSON form are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    /// Keep nodes with no `valid_until`, or one strictly after this cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Keep nodes whose type is listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_types: Option<BTreeSet<String>>,
    /// Keep nodes whose `source` is listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeSet<String>>,
}

impl Filters {
    /// Parses filters from JSON. `null` means no filters.
    pub fn from_value(value: JsonValue) -> Result<Self, AppError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| AppError::InvalidArgument(format!("malformed filters: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.valid_until.is_none() && self.node_types.is_none() && self.sources.is_none()
    }
}

/// Pure predicate pipeline over candidate nodes.
///
/// Stages run in a fixed order: validity cutoff, node type, source.
pub struct FilterPipeline;

impl FilterPipeline {
    /// Returns the nodes that pass every present filter, order preserved.
    pub fn apply(nodes: Vec<Node>, filters: &Filters) -> Vec<Node> {
        if filters.is_empty() {
            return nodes;
        }

        let mut nodes = nodes;
        if let Some(cutoff) = filters.valid_until {
            nodes.retain(|node| Self::still_valid(node, cutoff));
        }
        if let Some(types) = &filters.node_types {
            nodes.retain(|node| types.contains(&node.node_type));
        }
        if let Some(sources) = &filters.sources {
            nodes.retain(|node| {
                node.properties
                    .source
                    .as_ref()
                    .is_some_and(|source| sources.contains(source))
            });
        }
        nodes
    }

    fn still_valid(node: &Node, cutoff: DateTime<Utc>) -> bool {
        match node.properties.valid_until {
            Some(valid_until) => valid_until > cutoff,
            None => true,
        }
    }
}
