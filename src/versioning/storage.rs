//! Durable backing for version histories.
//!
//! [`VersionStore`](super::VersionStore) keeps histories in memory and
//! writes a graph's history through a [`VersionStorage`] after every append.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::GraphVersion;

/// Stored histories, keyed by graph id.
pub type Histories = BTreeMap<String, Vec<GraphVersion>>;

/// Persistence for version histories.
#[async_trait]
pub trait VersionStorage: Send + Sync {
    /// Every stored history.
    async fn load(&self) -> Result<Histories, AppError>;

    /// Replaces the stored history of one graph.
    async fn save(&self, graph_id: &str, history: &[GraphVersion]) -> Result<(), AppError>;
}

/// All histories in one JSON file:
///
/// ```json
/// {"g1": [{"version_id": "g1:v1", "version_number": 1, ...}]}
/// ```
///
/// A missing file reads as empty. Writes go to a sibling temp file that is
/// then renamed over the target.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    cache: Mutex<Option<Histories>>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<Histories, AppError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Histories::new());
        }
        let raw = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[async_trait]
impl VersionStorage for JsonFileStorage {
    async fn load(&self) -> Result<Histories, AppError> {
        let mut cache = self.cache.lock().await;
        let histories = self.read_file().await?;
        tracing::debug!(
            path = %self.path.display(),
            graphs = histories.len(),
            "Loaded version histories"
        );
        *cache = Some(histories.clone());
        Ok(histories)
    }

    async fn save(&self, graph_id: &str, history: &[GraphVersion]) -> Result<(), AppError> {
        let mut cache = self.cache.lock().await;
        let mut histories = match cache.take() {
            Some(histories) => histories,
            None => self.read_file().await?,
        };
        histories.insert(graph_id.to_string(), history.to_vec());

        let raw = serde_json::to_vec_pretty(&histories)?;
        let tmp = self.path.with_extension("tmp");
        let written = async {
            tokio::fs::write(&tmp, raw).await?;
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        match written {
            Ok(()) => {
                *cache = Some(histories);
                Ok(())
            }
            // Leave the cache empty so the next save rereads the file.
            Err(err) => Err(err.into()),
        }
    }
}
