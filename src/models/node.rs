//! Node model representing vertices in a semantic graph.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A node in a semantic graph.
///
/// Nodes returned in a subgraph are snapshots; mutation happens only
/// through the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph.
    pub id: String,
    /// Type tag (e.g. "Document", "Concept").
    #[serde(rename = "type")]
    pub node_type: String,
    /// Well-known and free-form properties.
    #[serde(default)]
    pub properties: NodeProperties,
}

/// Node property bag.
///
/// The fields the reasoning core interprets are typed; everything else
/// lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    /// Where the fact came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// When the fact was recorded (opaque string, not interpreted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Whether the source has been verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Instant after which the node is no longer valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Expiration instant carried through from ingestion metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Unrecognized keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Node {
    /// Creates a node with empty properties.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: NodeProperties::default(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.properties.source = Some(source.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.properties.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.properties.verified = Some(verified);
        self
    }

    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.properties.valid_until = Some(valid_until);
        self
    }

    /// Sets a free-form property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.properties.extra.insert(key.into(), value.into());
        self
    }

    /// True if the node's source has been verified.
    pub fn is_verified(&self) -> bool {
        self.properties.verified.unwrap_or(false)
    }
}

impl NodeProperties {
    /// Number of provenance fields (`source`, `timestamp`) that are present.
    pub fn provenance_fields_present(&self) -> usize {
        usize::from(self.source.is_some()) + usize::from(self.timestamp.is_some())
    }

    /// Renders the properties as `key=value` pairs, well-known keys first.
    pub fn render_pairs(&self) -> Vec<String> {
        let mut pairs = Vec::new();
        if let Some(source) = &self.source {
            pairs.push(format!("source={}", source));
        }
        if let Some(timestamp) = &self.timestamp {
            pairs.push(format!("timestamp={}", timestamp));
        }
        if let Some(verified) = self.verified {
            pairs.push(format!("verified={}", verified));
        }
        if let Some(valid_until) = self.valid_until {
            pairs.push(format!("valid_until={}", valid_until.to_rfc3339()));
        }
        if let Some(expires_at) = self.expires_at {
            pairs.push(format!("expires_at={}", expires_at.to_rfc3339()));
        }
        for (key, value) in &self.extra {
            match value {
                JsonValue::String(s) => pairs.push(format!("{}={}", key, s)),
                other => pairs.push(format!("{}={}", key, other)),
            }
        }
        pairs
    }
}
