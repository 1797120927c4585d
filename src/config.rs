//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. User config: `~/.config/groundgraph/config.toml` (XDG) or platform config dir
//! 3. Project config: `.groundgraph.toml`
//! 4. Environment variables: `GROUNDGRAPH_*`, `__` separating nested keys
//!    (e.g. `GROUNDGRAPH_REASONING__MAX_DEPTH=3`)
//!
//! # Example
//!
//! ```toml
//! [store]
//! backend = "memory"
//! snapshot = "graphs.json"
//! versions = "graphs.versions.json"
//!
//! [reasoning]
//! max_depth = 2
//! concurrency = 8
//! timeout_ms = 30000
//!
//! [groundedness]
//! threshold = 0.7
//!
//! [groundedness.weights]
//! completeness = 0.4
//! connectivity = 0.3
//! verification = 0.3
//!
//! [[groundedness.rules]]
//! name = "non-trivial"
//! kind = "min_nodes"
//! min = 2
//!
//! [audit]
//! enabled = true
//! sink = "file"
//! dir = "logs/audit"
//! ```

use std::ops::Deref;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::reasoning::ValidationRule;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub reasoning: ReasoningConfig,
    pub groundedness: GroundednessConfig,
    pub audit: AuditConfig,
    pub generation: GenerationConfig,
}

/// Available graph store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
}

/// Graph store selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// JSON snapshot loaded at startup (memory backend).
    pub snapshot: Option<PathBuf>,
    /// JSON file holding version histories. Defaults to a
    /// `<snapshot>.versions.json` sibling of the snapshot.
    pub versions: Option<PathBuf>,
}

impl StoreConfig {
    /// Where version histories are kept, if anywhere.
    pub fn versions_path(&self) -> Option<PathBuf> {
        self.versions.clone().or_else(|| {
            self.snapshot
                .as_ref()
                .map(|snapshot| snapshot.with_extension("versions.json"))
        })
    }
}

/// Traversal and query limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Depth used when a query does not specify one.
    pub max_depth: u32,
    /// Largest depth a query may request.
    pub max_depth_limit: u32,
    /// Cap on simultaneous outstanding store calls during expansion.
    pub concurrency: usize,
    /// Deadline for one query, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_depth_limit: 10,
            concurrency: 8,
            timeout_ms: 30_000,
        }
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Weights of the groundedness components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundednessWeights {
    pub completeness: f64,
    pub connectivity: f64,
    pub verification: f64,
}

impl Default for GroundednessWeights {
    fn default() -> Self {
        Self {
            completeness: 0.4,
            connectivity: 0.3,
            verification: 0.3,
        }
    }
}

/// Groundedness scoring and validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundednessConfig {
    /// Minimum score for a subgraph to be valid.
    pub threshold: f64,
    pub weights: GroundednessWeights,
    /// Extra rules evaluated in order after scoring.
    pub rules: Vec<ValidationRule>,
}

impl Default for GroundednessConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            weights: GroundednessWeights::default(),
            rules: Vec::new(),
        }
    }
}

/// Where audit records go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    #[default]
    Tracing,
    File,
    Memory,
}

/// Audit trail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub sink: AuditSinkKind,
    /// Output directory for the file sink.
    pub dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: AuditSinkKind::default(),
            dir: PathBuf::from("logs/audit"),
        }
    }
}

/// Available text-generation backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationBackend {
    #[default]
    Extractive,
}

/// Text-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub backend: GenerationBackend,
    /// Most nodes included in the generation context.
    pub max_context_nodes: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::default(),
            max_context_nodes: 50,
        }
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, AppError> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(Self::user_config_path()))
            // Project config
            .merge(Toml::file(".groundgraph.toml"))
            // Environment variables (highest priority)
            .merge(Env::prefixed("GROUNDGRAPH_").split("__"));
        Self::from_figment(figment)
    }

    /// Extracts and validates a config from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, AppError> {
        let config: Config = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the reasoning core cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        let g = &self.groundedness;
        if !(0.0..=1.0).contains(&g.threshold) {
            return Err(AppError::InvalidArgument(format!(
                "groundedness.threshold must be within [0, 1], got {}",
                g.threshold
            )));
        }

        let w = g.weights;
        let weights = [w.completeness, w.connectivity, w.verification];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AppError::InvalidArgument(
                "groundedness.weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(AppError::InvalidArgument(
                "groundedness.weights must not all be zero".to_string(),
            ));
        }

        let r = &self.reasoning;
        if r.concurrency == 0 {
            return Err(AppError::InvalidArgument(
                "reasoning.concurrency must be at least 1".to_string(),
            ));
        }
        if r.max_depth > r.max_depth_limit {
            return Err(AppError::InvalidArgument(format!(
                "reasoning.max_depth ({}) exceeds reasoning.max_depth_limit ({})",
                r.max_depth, r.max_depth_limit
            )));
        }
        Ok(())
    }

    /// User config path: ~/.config/groundgraph/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("groundgraph").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("groundgraph").join("config.toml"))
            .unwrap_or_default()
    }
}
