//! Append-only version histories, one per graph.
//!
//! # Locking
//!
//! - The outer `RwLock<HashMap>` only guards the set of histories and is
//!   held just long enough to find or insert one.
//! - Each history has its own `RwLock`. Appends take it for writing, so
//!   sequence allocation is serialized per graph while different graphs
//!   proceed independently.
//! - Reads clone under the read lock and never see a half-appended version.
//! - With a [`VersionStorage`] attached, the history is saved while its
//!   write lock is held; a failed save undoes the append.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::storage::VersionStorage;
use crate::error::AppError;
use crate::models::{GraphVersion, VersionMetadata};

type History = Arc<RwLock<Vec<GraphVersion>>>;

/// Version histories, optionally written through to durable storage.
#[derive(Default)]
pub struct VersionStore {
    histories: RwLock<HashMap<String, History>>,
    storage: Option<Arc<dyn VersionStorage>>,
}

impl fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionStore")
            .field("durable", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}

impl VersionStore {
    /// A store that lives only as long as the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every stored history and writes later appends back to `storage`.
    pub async fn open(storage: Arc<dyn VersionStorage>) -> Result<Self, AppError> {
        let histories = storage
            .load()
            .await?
            .into_iter()
            .map(|(graph_id, versions)| (graph_id, Arc::new(RwLock::new(versions))))
            .collect();
        Ok(Self {
            histories: RwLock::new(histories),
            storage: Some(storage),
        })
    }

    /// Appends the next version of `graph_id`.
    ///
    /// Numbers start at 1 and are never reused. An unlabeled version gets
    /// the id `<graph_id>:v<n>`; a labeled one keeps the label verbatim and
    /// still consumes a number. `created_at` is strictly greater than the
    /// previous version's.
    pub async fn append(
        &self,
        graph_id: &str,
        metadata: VersionMetadata,
        label: Option<&str>,
    ) -> Result<GraphVersion, AppError> {
        let history = self.history_for_write(graph_id).await;
        let mut versions = history.write().await;

        if let Some(label) = label {
            Self::check_label(graph_id, label, &versions)?;
        }

        let version_number = versions.last().map_or(1, |v| v.version_number + 1);
        let mut created_at = Utc::now();
        if let Some(previous) = versions.last() {
            if created_at <= previous.created_at {
                created_at = previous.created_at + Duration::microseconds(1);
            }
        }

        let version = GraphVersion {
            version_id: label
                .map(str::to_string)
                .unwrap_or_else(|| GraphVersion::derived_id(graph_id, version_number)),
            graph_id: graph_id.to_string(),
            version_number,
            created_at,
            metadata,
        };
        versions.push(version.clone());

        if let Some(storage) = &self.storage {
            if let Err(err) = storage.save(graph_id, &versions).await {
                versions.pop();
                tracing::error!(
                    graph_id = %graph_id,
                    version_id = %version.version_id,
                    error = %err,
                    "Failed to persist version history"
                );
                return Err(err);
            }
        }
        Ok(version)
    }

    /// Fails like [`append`](Self::append) would if `label` cannot be used
    /// for the next version of `graph_id`.
    pub async fn check_label_available(&self, graph_id: &str, label: &str) -> Result<(), AppError> {
        match self.history(graph_id).await {
            Some(history) => Self::check_label(graph_id, label, &history.read().await),
            None => Self::check_label(graph_id, label, &[]),
        }
    }

    /// Chronological history; empty for an unknown graph.
    pub async fn list(&self, graph_id: &str) -> Vec<GraphVersion> {
        match self.history(graph_id).await {
            Some(history) => history.read().await.clone(),
            None => Vec::new(),
        }
    }

    pub async fn get(&self, graph_id: &str, version_id: &str) -> Option<GraphVersion> {
        let history = self.history(graph_id).await?;
        let versions = history.read().await;
        versions.iter().find(|v| v.version_id == version_id).cloned()
    }

    /// Most recently appended version.
    pub async fn latest(&self, graph_id: &str) -> Option<GraphVersion> {
        let history = self.history(graph_id).await?;
        let versions = history.read().await;
        versions.last().cloned()
    }

    async fn history(&self, graph_id: &str) -> Option<History> {
        self.histories.read().await.get(graph_id).cloned()
    }

    async fn history_for_write(&self, graph_id: &str) -> History {
        if let Some(history) = self.history(graph_id).await {
            return history;
        }
        self.histories
            .write()
            .await
            .entry(graph_id.to_string())
            .or_default()
            .clone()
    }

    fn check_label(graph_id: &str, label: &str, versions: &[GraphVersion]) -> Result<(), AppError> {
        if label.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "version label must not be empty".into(),
            ));
        }
        if label.starts_with(&format!("{}:v", graph_id)) {
            return Err(AppError::InvalidArgument(format!(
                "version label '{}' collides with generated version ids",
                label
            )));
        }
        if versions.iter().any(|v| v.version_id == label) {
            return Err(AppError::InvalidArgument(format!(
                "version '{}' already exists for graph '{}'",
                label, graph_id
            )));
        }
        Ok(())
    }
}
