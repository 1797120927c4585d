//! Graph version records and version diffs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of change a version records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Major,
    Minor,
    Patch,
    Temporal,
}

impl VersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionType::Major => "major",
            VersionType::Minor => "minor",
            VersionType::Patch => "patch",
            VersionType::Temporal => "temporal",
        }
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(VersionType::Major),
            "minor" => Ok(VersionType::Minor),
            "patch" => Ok(VersionType::Patch),
            "temporal" => Ok(VersionType::Temporal),
            other => Err(format!(
                "unknown version type '{}', expected major, minor, patch or temporal",
                other
            )),
        }
    }
}

/// Metadata attached to a graph version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Instant after which the version is no longer temporally valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_type: Option<VersionType>,
    /// Free-form metadata.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl VersionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_version_type(mut self, version_type: VersionType) -> Self {
        self.version_type = Some(version_type);
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// All metadata as a flat key/value map, well-known fields included.
    pub fn entries(&self) -> BTreeMap<String, JsonValue> {
        let mut entries = self.extra.clone();
        if let Some(expires_at) = self.expires_at {
            entries.insert(
                "expires_at".to_string(),
                JsonValue::String(expires_at.to_rfc3339()),
            );
        }
        if let Some(version_type) = self.version_type {
            entries.insert(
                "version_type".to_string(),
                JsonValue::String(version_type.to_string()),
            );
        }
        entries
    }
}

/// An immutable entry in a graph's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphVersion {
    /// Unique within the graph: a caller label or `<graph_id>:v<n>`.
    pub version_id: String,
    /// Graph this version belongs to.
    pub graph_id: String,
    /// Position in the history, starting at 1.
    pub version_number: u64,
    /// Creation instant; strictly increasing within one history.
    pub created_at: DateTime<Utc>,
    /// Version metadata.
    #[serde(default)]
    pub metadata: VersionMetadata,
}

impl GraphVersion {
    /// Derived version id for an unlabeled version.
    pub fn derived_id(graph_id: &str, version_number: u64) -> String {
        format!("{}:v{}", graph_id, version_number)
    }

    /// True if the version exists at `at`: created at or before it and not
    /// yet expired.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        if self.created_at > at {
            return false;
        }
        match self.metadata.expires_at {
            Some(expires_at) => at <= expires_at,
            None => true,
        }
    }
}

/// Metadata key classification between two versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDiff {
    /// Keys only in the second version.
    pub added: Vec<String>,
    /// Keys only in the first version.
    pub removed: Vec<String>,
    /// Keys in both with different values.
    pub changed: Vec<String>,
}

impl MetadataDiff {
    /// Classifies every key present in either map. Keys come out sorted.
    pub fn between(a: &BTreeMap<String, JsonValue>, b: &BTreeMap<String, JsonValue>) -> Self {
        let mut diff = Self::default();
        for (key, value_a) in a {
            match b.get(key) {
                None => diff.removed.push(key.clone()),
                Some(value_b) if value_b != value_a => diff.changed.push(key.clone()),
                Some(_) => {}
            }
        }
        for key in b.keys() {
            if !a.contains_key(key) {
                diff.added.push(key.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Added/removed/modified element ids.
///
/// Structural node and edge diffing is not computed by the version manager;
/// these lists are reserved for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl ElementDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Result of comparing two versions of one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub graph_id: String,
    pub version_a: String,
    pub version_b: String,
    /// True only when both sides are the same version.
    pub identical: bool,
    pub metadata: MetadataDiff,
    pub nodes: ElementDiff,
    pub edges: ElementDiff,
}

impl VersionDiff {
    /// Diff of a version against itself.
    pub fn identical(graph_id: &str, version_id: &str) -> Self {
        Self {
            graph_id: graph_id.to_string(),
            version_a: version_id.to_string(),
            version_b: version_id.to_string(),
            identical: true,
            metadata: MetadataDiff::default(),
            nodes: ElementDiff::default(),
            edges: ElementDiff::default(),
        }
    }
}
