//! Application error types with taxonomy classification.

use std::time::Duration;

use thiserror::Error;

/// Application-level errors for Groundgraph.
#[derive(Error, Debug)]
pub enum AppError {
    // Lookup errors
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Version '{version_id}' not found for graph '{graph_id}'")]
    VersionNotFound { graph_id: String, version_id: String },

    #[error("Node '{node_id}' not found in graph '{graph_id}'")]
    NodeNotFound { graph_id: String, node_id: String },

    // Caller errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Collaborator errors
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("Query exceeded deadline of {0:?}")]
    Timeout(Duration),

    // Invariant violations
    #[error("Internal error: {0}")]
    Internal(String),

    // Plumbing
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error classification used for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Unavailable,
    DeadlineExceeded,
    Internal,
}

impl AppError {
    /// Shorthand for an [`AppError::Unavailable`] raised by a named collaborator.
    pub fn unavailable(service: impl Into<String>, message: impl ToString) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::GraphNotFound(_)
            | AppError::VersionNotFound { .. }
            | AppError::NodeNotFound { .. } => ErrorKind::NotFound,
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::Unavailable { .. } | AppError::Io(_) => ErrorKind::Unavailable,
            AppError::Timeout(_) => ErrorKind::DeadlineExceeded,
            AppError::Config(_) => ErrorKind::InvalidArgument,
            AppError::Internal(_) | AppError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for errors that are the caller's to fix and must not be retried.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::InvalidArgument
        )
    }
}
