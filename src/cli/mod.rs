//! CLI module for Groundgraph.
//!
//! Subcommands:
//! - `ingest`: Build a graph from a JSON document list
//! - `update`: Add nodes and edges to a graph, optionally as a labeled clone
//! - `query`: Answer a query from a graph snapshot
//! - `versions`: List a graph's versions with their temporal validity
//! - `compare`: Diff the metadata of two versions
//! - `validate`: Score a subgraph JSON file

mod ingest;
mod query;
mod update;
mod validate;
mod versions;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::models::VersionType;

/// Groundgraph - grounded subgraph reasoning over versioned semantic graphs
#[derive(Parser)]
#[command(name = "groundgraph")]
#[command(about = "Grounded subgraph reasoning over versioned semantic graphs")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Store snapshot to read and write (overrides store.snapshot)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a new graph from a JSON array of documents
    Ingest {
        /// Path to the documents file
        documents: PathBuf,

        /// Label for the graph's first version
        #[arg(long)]
        label: Option<String>,

        /// Kind of change: major, minor, patch or temporal
        #[arg(long)]
        version_type: Option<VersionType>,
    },

    /// Apply a JSON graph update ({"add_nodes": [...], "add_edges": [...]})
    Update {
        /// Graph to update
        graph: String,

        /// Path to the update file
        update: PathBuf,

        /// Apply to a clone named <graph>_v<label> with a version labeled <label>
        #[arg(long)]
        label: Option<String>,

        /// Kind of change: major, minor, patch or temporal
        #[arg(long)]
        version_type: Option<VersionType>,
    },

    /// Answer a query from the subgraph around it
    Query {
        /// Query text
        text: String,

        /// Graph to query
        #[arg(long)]
        graph: String,

        /// Expansion depth (defaults to the configured depth)
        #[arg(long)]
        depth: Option<u32>,

        /// Seed filters as a JSON object
        #[arg(long)]
        filters: Option<String>,

        /// User recorded in the audit trail
        #[arg(long)]
        user: Option<String>,

        /// Session recorded in the audit trail
        #[arg(long)]
        session: Option<String>,
    },

    /// List a graph's versions, oldest first
    Versions {
        /// Graph whose history to list
        graph: String,

        /// Check temporal validity at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
    },

    /// Compare the metadata of two versions of a graph
    Compare {
        /// Graph both versions belong to
        graph: String,

        /// Base version id
        version_a: String,

        /// Version id compared against the base
        version_b: String,
    },

    /// Score a subgraph JSON file for groundedness
    Validate {
        /// Path to the subgraph file
        subgraph: PathBuf,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match &self.command {
            Command::Ingest {
                documents,
                label,
                version_type,
            } => {
                self.run_ingest(documents, label.as_deref(), *version_type)
                    .await
            }
            Command::Update {
                graph,
                update,
                label,
                version_type,
            } => {
                self.run_update(graph, update, label.as_deref(), *version_type)
                    .await
            }
            Command::Query {
                text,
                graph,
                depth,
                filters,
                user,
                session,
            } => {
                self.run_query(text, graph, *depth, filters.as_deref(), user, session)
                    .await
            }
            Command::Versions { graph, at } => self.run_versions(graph, at.as_deref()).await,
            Command::Compare {
                graph,
                version_a,
                version_b,
            } => self.run_compare(graph, version_a, version_b).await,
            Command::Validate { subgraph } => self.run_validate(subgraph),
        }
    }

    /// Layered configuration with the `--snapshot` override applied.
    fn config(&self) -> color_eyre::Result<Config> {
        let mut config = Config::load()?;
        if let Some(snapshot) = &self.snapshot {
            config.store.snapshot = Some(snapshot.clone());
        }
        Ok(config)
    }
}

/// Prints `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
