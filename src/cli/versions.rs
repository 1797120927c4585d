//! Version listing and comparison handlers.

use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::Serialize;

use crate::context::Context;
use crate::models::GraphVersion;

use super::{print_json, App};

#[derive(Serialize)]
struct VersionEntry {
    #[serde(flatten)]
    version: GraphVersion,
    temporally_valid: bool,
}

#[derive(Serialize)]
struct VersionListing {
    graph_id: String,
    at: DateTime<Utc>,
    versions: Vec<VersionEntry>,
}

impl App {
    /// List a graph's versions with their validity at `at` (default now).
    pub async fn run_versions(&self, graph_id: &str, at: Option<&str>) -> Result<()> {
        let at = match at {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .wrap_err("--at is not an RFC 3339 timestamp")?
                .with_timezone(&Utc),
            None => Utc::now(),
        };

        let ctx = Context::new(self.config()?).await?;
        let mut versions = Vec::new();
        for version in ctx.versions.list_versions(graph_id).await {
            let temporally_valid = ctx
                .versions
                .is_temporally_valid(graph_id, &version.version_id, Some(at))
                .await;
            versions.push(VersionEntry {
                version,
                temporally_valid,
            });
        }
        tracing::debug!(graph_id = %graph_id, count = versions.len(), "Listed versions");

        print_json(&VersionListing {
            graph_id: graph_id.to_string(),
            at,
            versions,
        })
    }

    /// Print the metadata diff between two versions.
    pub async fn run_compare(&self, graph_id: &str, version_a: &str, version_b: &str) -> Result<()> {
        let ctx = Context::new(self.config()?).await?;
        let diff = ctx
            .versions
            .compare_versions(graph_id, version_a, version_b)
            .await?;
        print_json(&diff)
    }
}
