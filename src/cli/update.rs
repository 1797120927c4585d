//! Update command handler.

use std::path::Path;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::context::Context;
use crate::models::VersionType;
use crate::services::{Actor, GraphService, GraphUpdate};

use super::{print_json, App};

impl App {
    /// Apply an update file to a graph and persist the store snapshot.
    pub async fn run_update(
        &self,
        graph_id: &str,
        update: &Path,
        label: Option<&str>,
        version_type: Option<VersionType>,
    ) -> Result<()> {
        let config = self.config()?;
        let snapshot = config
            .store
            .snapshot
            .clone()
            .ok_or_else(|| eyre!("No snapshot path: pass --snapshot or set store.snapshot"))?;

        let content = std::fs::read_to_string(update)
            .wrap_err_with(|| format!("Failed to read {}", update.display()))?;
        let mut update: GraphUpdate = serde_json::from_str(&content)
            .wrap_err_with(|| format!("{} is not a valid graph update", update.display()))?;
        if version_type.is_some() {
            update.version_type = version_type;
        }

        let ctx = Context::new(config).await?;
        let service = GraphService::new(&ctx);
        let report = service
            .update_graph(graph_id, update, label, &Actor::default())
            .await?;

        ctx.backend.persist(&snapshot).await?;
        tracing::info!(
            graph_id = %report.graph_id,
            path = %snapshot.display(),
            "Wrote store snapshot"
        );

        print_json(&report)
    }
}
