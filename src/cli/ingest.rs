//! Ingest command handler.

use std::path::Path;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::context::Context;
use crate::models::{VersionMetadata, VersionType};
use crate::services::{Actor, Document, GraphService};

use super::{print_json, App};

impl App {
    /// Build a graph from a documents file and persist the store snapshot.
    ///
    /// Graphs already in the snapshot are kept; the version history is
    /// written next to it.
    pub async fn run_ingest(
        &self,
        documents: &Path,
        label: Option<&str>,
        version_type: Option<VersionType>,
    ) -> Result<()> {
        let config = self.config()?;
        let snapshot = config
            .store
            .snapshot
            .clone()
            .ok_or_else(|| eyre!("No snapshot path: pass --snapshot or set store.snapshot"))?;

        let content = std::fs::read_to_string(documents)
            .wrap_err_with(|| format!("Failed to read {}", documents.display()))?;
        let documents: Vec<Document> = serde_json::from_str(&content)
            .wrap_err_with(|| format!("{} is not a JSON array of documents", documents.display()))?;
        tracing::info!(count = documents.len(), "Loaded documents");

        let mut metadata = VersionMetadata::new();
        metadata.version_type = version_type;

        let ctx = Context::new(config).await?;
        let service = GraphService::new(&ctx);
        let report = service
            .ingest_documents(documents, metadata, label, &Actor::default())
            .await?;

        ctx.backend.persist(&snapshot).await?;
        tracing::info!(path = %snapshot.display(), "Wrote store snapshot");

        print_json(&report)
    }
}
