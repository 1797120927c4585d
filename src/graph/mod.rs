//! Graph store abstraction for backend-agnostic node/edge access.
//!
//! The reasoning core never talks to a database directly. It consumes the
//! [`GraphStore`] trait, and a backend chosen at startup is injected as an
//! `Arc<dyn GraphStore>`.
//!
//! # Usage
//!
//! ```ignore
//! use groundgraph::graph::{GraphStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.create_graph("g1", &VersionMetadata::new()).await?;
//! store.add_node("g1", Node::new("rust", "Concept")).await?;
//!
//! let seeds = store.search_nodes("g1", "rust").await?;
//! ```

mod traits;

pub mod backends;

pub use backends::MemoryStore;
pub use traits::GraphStore;

use std::path::Path;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::AppError;

/// A connected store backend, selected by configuration.
#[derive(Clone)]
pub enum Backend {
    Memory(Arc<MemoryStore>),
}

impl Backend {
    /// Builds the configured store backend.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        match config.backend {
            StoreBackend::Memory => {
                let store = match &config.snapshot {
                    Some(path) if path.exists() => MemoryStore::load_snapshot(path).await?,
                    Some(path) => {
                        tracing::warn!(
                            path = %path.display(),
                            "Snapshot file not found, starting with an empty store"
                        );
                        MemoryStore::new()
                    }
                    None => MemoryStore::new(),
                };
                Ok(Backend::Memory(Arc::new(store)))
            }
        }
    }

    /// The backend as a trait object for injection.
    pub fn store(&self) -> Arc<dyn GraphStore> {
        match self {
            Backend::Memory(store) => store.clone(),
        }
    }

    /// Writes the backend's contents to `path`.
    pub async fn persist(&self, path: &Path) -> Result<(), AppError> {
        match self {
            Backend::Memory(store) => store.write_snapshot(path).await,
        }
    }
}
