//! Application context: the shared components every command works with.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::graph::{Backend, GraphStore};
use crate::reasoning::{ConceptResolver, GroundednessValidator, KeywordResolver, ReasoningOrchestrator};
use crate::services::{generator_for, AuditLog, TextGenerator};
use crate::versioning::{JsonFileStorage, VersionManager, VersionStore};

/// Root of the component graph, built once from [`Config`].
///
/// Every collaborator is held behind an `Arc` (or is cheap to clone), so the
/// context itself can be cloned into services freely.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub backend: Backend,
    pub store: Arc<dyn GraphStore>,
    pub resolver: Arc<dyn ConceptResolver>,
    pub orchestrator: Arc<ReasoningOrchestrator>,
    pub versions: VersionManager,
    pub audit: AuditLog,
    pub generator: Arc<dyn TextGenerator>,
}

impl Context {
    /// Validates the configuration, connects the configured store and
    /// opens the version histories.
    pub async fn new(config: Config) -> Result<Self, AppError> {
        config.validate()?;
        let backend = Backend::connect(&config.store).await?;
        let versions = match config.store.versions_path() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Opening version histories");
                let store = VersionStore::open(Arc::new(JsonFileStorage::new(path))).await?;
                VersionManager::new(Arc::new(store))
            }
            None => VersionManager::default(),
        };
        Ok(Self::with_backend(config, backend).with_versions(versions))
    }

    /// Builds the context around an already connected backend.
    pub fn with_backend(config: Config, backend: Backend) -> Self {
        let store = backend.store();
        let resolver: Arc<dyn ConceptResolver> = Arc::new(KeywordResolver);
        let orchestrator = ReasoningOrchestrator::new(
            store.clone(),
            resolver.clone(),
            GroundednessValidator::new(&config.groundedness),
            config.reasoning.clone(),
        );

        Self {
            audit: AuditLog::from_config(&config.audit),
            generator: generator_for(&config.generation),
            versions: VersionManager::default(),
            orchestrator: Arc::new(orchestrator),
            resolver,
            store,
            backend,
            config: Arc::new(config),
        }
    }

    /// Replaces the version manager.
    pub fn with_versions(mut self, versions: VersionManager) -> Self {
        self.versions = versions;
        self
    }

    /// Replaces the audit log.
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }
}
