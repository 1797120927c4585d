//! Domain models for graphs, subgraphs, versions and validation.

mod edge;
mod node;
mod subgraph;
mod validation;
mod version;

pub use edge::Edge;
pub use node::{Node, NodeProperties};
pub use subgraph::Subgraph;
pub use validation::{ScoreBreakdown, ValidationResult};
pub use version::{
    ElementDiff, GraphVersion, MetadataDiff, VersionDiff, VersionMetadata, VersionType,
};

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    ulid::Ulid::new().to_string()
}
