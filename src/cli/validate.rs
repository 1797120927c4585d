//! Validate command handler.

use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::models::Subgraph;
use crate::reasoning::GroundednessValidator;

use super::{print_json, App};

impl App {
    /// Score a subgraph file with the configured threshold and rules.
    pub fn run_validate(&self, path: &Path) -> Result<()> {
        let config = self.config()?;
        config.validate()?;

        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let subgraph: Subgraph = serde_json::from_str(&content)
            .wrap_err_with(|| format!("{} is not a valid subgraph", path.display()))?;

        let result = GroundednessValidator::new(&config.groundedness).validate(&subgraph);
        tracing::info!(
            nodes = subgraph.node_count(),
            score = result.groundedness_score,
            valid = result.is_valid,
            "Validated subgraph"
        );

        print_json(&result)
    }
}
