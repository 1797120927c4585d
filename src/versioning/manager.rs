//! Version operations used by the graph mutation flow.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::store::VersionStore;
use crate::error::AppError;
use crate::models::{ElementDiff, GraphVersion, MetadataDiff, VersionDiff, VersionMetadata};

/// Creates, looks up and compares graph versions.
#[derive(Debug, Clone)]
pub struct VersionManager {
    store: Arc<VersionStore>,
}

impl Default for VersionManager {
    fn default() -> Self {
        Self::new(Arc::new(VersionStore::new()))
    }
}

impl VersionManager {
    pub fn new(store: Arc<VersionStore>) -> Self {
        Self { store }
    }

    /// Records a new version and returns its id.
    pub async fn create_version(
        &self,
        graph_id: &str,
        metadata: VersionMetadata,
        label: Option<&str>,
    ) -> Result<String, AppError> {
        let version = self.store.append(graph_id, metadata, label).await?;
        tracing::info!(
            graph_id = %graph_id,
            version_id = %version.version_id,
            version_number = version.version_number,
            "Created graph version"
        );
        Ok(version.version_id)
    }

    /// Exact lookup, or the latest version when `version_id` is `None`.
    pub async fn get_version(
        &self,
        graph_id: &str,
        version_id: Option<&str>,
    ) -> Result<GraphVersion, AppError> {
        let found = match version_id {
            Some(id) => self.store.get(graph_id, id).await,
            None => self.store.latest(graph_id).await,
        };
        found.ok_or_else(|| AppError::VersionNotFound {
            graph_id: graph_id.to_string(),
            version_id: version_id.unwrap_or("latest").to_string(),
        })
    }

    /// Fails if `label` cannot name the next version of `graph_id`.
    pub async fn check_label(&self, graph_id: &str, label: &str) -> Result<(), AppError> {
        self.store.check_label_available(graph_id, label).await
    }

    pub async fn list_versions(&self, graph_id: &str) -> Vec<GraphVersion> {
        self.store.list(graph_id).await
    }

    pub async fn latest(&self, graph_id: &str) -> Option<GraphVersion> {
        self.store.latest(graph_id).await
    }

    /// Whether the version applies at `at` (default now). Unknown versions
    /// are never valid.
    pub async fn is_temporally_valid(
        &self,
        graph_id: &str,
        version_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> bool {
        match self.store.get(graph_id, version_id).await {
            Some(version) => version.is_valid_at(at.unwrap_or_else(Utc::now)),
            None => false,
        }
    }

    /// Metadata diff between two versions. Both must exist.
    pub async fn compare_versions(
        &self,
        graph_id: &str,
        version_a: &str,
        version_b: &str,
    ) -> Result<VersionDiff, AppError> {
        let a = self.get_version(graph_id, Some(version_a)).await?;
        if version_a == version_b {
            return Ok(VersionDiff::identical(graph_id, version_a));
        }
        let b = self.get_version(graph_id, Some(version_b)).await?;

        let metadata = MetadataDiff::between(&a.metadata.entries(), &b.metadata.entries());
        tracing::debug!(
            graph_id = %graph_id,
            version_a = %version_a,
            version_b = %version_b,
            added = metadata.added.len(),
            removed = metadata.removed.len(),
            changed = metadata.changed.len(),
            "Compared versions"
        );

        Ok(VersionDiff {
            graph_id: graph_id.to_string(),
            version_a: a.version_id,
            version_b: b.version_id,
            identical: false,
            metadata,
            nodes: ElementDiff::default(),
            edges: ElementDiff::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_get_version_defaults_to_latest() {
        let manager = VersionManager::default();
        manager.create_version("g1", VersionMetadata::new(), None).await.unwrap();
        let second = manager
            .create_version("g1", VersionMetadata::new(), Some("draft"))
            .await
            .unwrap();

        assert_eq!(manager.get_version("g1", None).await.unwrap().version_id, second);
        assert_eq!(
            manager.get_version("g1", Some("g1:v1")).await.unwrap().version_number,
            1
        );
        let ids: Vec<_> = manager
            .list_versions("g1")
            .await
            .into_iter()
            .map(|v| v.version_id)
            .collect();
        assert_eq!(ids, vec!["g1:v1", "draft"]);
    }

    #[tokio::test]
    async fn test_missing_versions_are_not_found() {
        let manager = VersionManager::default();
        let err = manager.get_version("g1", None).await.unwrap_err();
        assert!(matches!(err, AppError::VersionNotFound { .. }));

        manager.create_version("g1", VersionMetadata::new(), None).await.unwrap();
        let err = manager
            .compare_versions("g1", "g1:v1", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VersionNotFound { .. }));

        let err = manager.compare_versions("g1", "nope", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::VersionNotFound { .. }));
        assert!(manager.list_versions("g2").await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_never_duplicate_numbers() {
        let manager = Arc::new(VersionManager::default());
        let mut handles = Vec::new();
        for i in 0..40 {
            let manager = manager.clone();
            let graph_id = if i % 4 == 0 { "other" } else { "shared" };
            handles.push(tokio::spawn(async move {
                manager
                    .create_version(graph_id, VersionMetadata::new(), None)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let shared = manager.list_versions("shared").await;
        let numbers: Vec<u64> = shared.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, (1..=30).collect::<Vec<_>>());
        let ids: HashSet<_> = shared.iter().map(|v| v.version_id.clone()).collect();
        assert_eq!(ids.len(), 30);
        assert!(shared.windows(2).all(|w| w[0].created_at < w[1].created_at));
        assert_eq!(manager.list_versions("other").await.len(), 10);
    }

    #[tokio::test]
    async fn test_expired_version_is_not_valid() {
        let manager = VersionManager::default();
        let now = Utc::now();
        let id = manager
            .create_version(
                "g1",
                VersionMetadata::new().with_expires_at(now + Duration::minutes(5)),
                None,
            )
            .await
            .unwrap();

        assert!(manager.is_temporally_valid("g1", &id, None).await);
        assert!(
            !manager
                .is_temporally_valid("g1", &id, Some(now + Duration::hours(1)))
                .await
        );
        assert!(
            !manager
                .is_temporally_valid("g1", &id, Some(now - Duration::hours(1)))
                .await
        );
        assert!(!manager.is_temporally_valid("g1", "missing", None).await);
    }

    #[tokio::test]
    async fn test_compare_versions() {
        let manager = VersionManager::default();
        let a = manager
            .create_version(
                "g1",
                VersionMetadata::new().with_entry("author", "ana").with_entry("draft", true),
                None,
            )
            .await
            .unwrap();
        let b = manager
            .create_version(
                "g1",
                VersionMetadata::new().with_entry("author", "bo").with_entry("label", "v2"),
                None,
            )
            .await
            .unwrap();

        let same = manager.compare_versions("g1", &a, &a).await.unwrap();
        assert!(same.identical);
        assert!(same.metadata.is_empty() && same.nodes.is_empty() && same.edges.is_empty());

        let forward = manager.compare_versions("g1", &a, &b).await.unwrap();
        assert!(!forward.identical);
        assert_eq!(forward.metadata.added, vec!["label"]);
        assert_eq!(forward.metadata.removed, vec!["draft"]);
        assert_eq!(forward.metadata.changed, vec!["author"]);

        let backward = manager.compare_versions("g1", &b, &a).await.unwrap();
        assert_eq!(backward.metadata.added, forward.metadata.removed);
        assert_eq!(backward.metadata.removed, forward.metadata.added);
        assert_eq!(backward.metadata.changed, forward.metadata.changed);
    }
}
