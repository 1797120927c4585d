//! Audit trail for graph mutations and query/response cycles.
//!
//! Records are handed to an [`AuditSink`] through [`AuditLog`], which never
//! lets a sink failure reach the primary operation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::{AuditConfig, AuditSinkKind};
use crate::error::AppError;
use crate::models::generate_ulid;
use crate::reasoning::Filters;

/// Who triggered an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl Actor {
    pub fn new(user_id: Option<String>, session_id: Option<String>) -> Self {
        Self {
            user_id,
            session_id,
        }
    }
}

/// Audited events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    GraphCreated {
        graph_id: String,
        documents: usize,
        skipped: usize,
        nodes: usize,
        edges: usize,
    },
    GraphUpdated {
        graph_id: String,
        source_graph_id: String,
        nodes_added: usize,
        edges_added: usize,
    },
    GraphVersioned {
        graph_id: String,
        version_id: String,
    },
    SubgraphExtracted {
        graph_id: String,
        node_ids: Vec<String>,
        edge_count: usize,
    },
    SubgraphValidated {
        graph_id: String,
        is_valid: bool,
        groundedness_score: f64,
        issues: Vec<String>,
    },
    Query {
        graph_id: String,
        query: String,
        filters: Filters,
    },
    Response {
        model_id: String,
        response_length: usize,
    },
}

/// Discriminant of an [`AuditEvent`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    GraphCreated,
    GraphUpdated,
    GraphVersioned,
    SubgraphExtracted,
    SubgraphValidated,
    Query,
    Response,
}

impl AuditEvent {
    pub fn kind(&self) -> AuditEventKind {
        match self {
            AuditEvent::GraphCreated { .. } => AuditEventKind::GraphCreated,
            AuditEvent::GraphUpdated { .. } => AuditEventKind::GraphUpdated,
            AuditEvent::GraphVersioned { .. } => AuditEventKind::GraphVersioned,
            AuditEvent::SubgraphExtracted { .. } => AuditEventKind::SubgraphExtracted,
            AuditEvent::SubgraphValidated { .. } => AuditEventKind::SubgraphValidated,
            AuditEvent::Query { .. } => AuditEventKind::Query,
            AuditEvent::Response { .. } => AuditEventKind::Response,
        }
    }
}

/// One entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// Id of the record that started the flow this one belongs to.
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), AppError>;
}

/// Emits records as structured log lines on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AppError> {
        let payload = serde_json::to_string(&record.event)?;
        tracing::info!(
            target: "audit",
            audit_id = %record.audit_id,
            kind = ?record.event.kind(),
            user_id = record.user_id.as_deref().unwrap_or(""),
            session_id = record.session_id.as_deref().unwrap_or(""),
            correlation_id = record.correlation_id.as_deref().unwrap_or(""),
            payload = %payload,
            "Audit event"
        );
        Ok(())
    }
}

/// Writes one pretty-printed JSON file per record.
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(record: &AuditRecord) -> String {
        let stem: String = format!(
            "{}_{}",
            record.timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
            record.audit_id
        )
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
        format!("audit_{}.json", stem)
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Self::file_name(record));
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, body).await?;
        tracing::debug!(path = %path.display(), "Wrote audit record");
        Ok(())
    }
}

/// Criteria for [`MemoryAuditSink::events`]. Absent fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub kind: Option<AuditEventKind>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Defaults to 100.
    pub limit: Option<usize>,
}

impl AuditFilter {
    fn matches(&self, record: &AuditRecord) -> bool {
        self.kind.map_or(true, |kind| record.event.kind() == kind)
            && self
                .user_id
                .as_ref()
                .map_or(true, |user| record.user_id.as_ref() == Some(user))
            && self
                .session_id
                .as_ref()
                .map_or(true, |session| record.session_id.as_ref() == Some(session))
            && self.start.map_or(true, |start| record.timestamp >= start)
            && self.end.map_or(true, |end| record.timestamp <= end)
    }
}

/// Keeps records in memory and answers queries over them.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching records, newest first.
    pub async fn events(&self, filter: &AuditFilter) -> Vec<AuditRecord> {
        let records = self.records.read().await;
        let mut matching: Vec<AuditRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // Stable sort keeps append order for equal timestamps; reversing
        // first makes later appends come first among them.
        matching.reverse();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(filter.limit.unwrap_or(100));
        matching
    }

    /// Every record of a session, oldest first.
    pub async fn trace(&self, session_id: &str) -> Vec<AuditRecord> {
        let records = self.records.read().await;
        let mut trace: Vec<AuditRecord> = records
            .iter()
            .filter(|r| r.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect();
        trace.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        trace
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AppError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

/// Audit front end used by services.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    enabled: bool,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self::new(Arc::new(TracingAuditSink), false)
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        let sink: Arc<dyn AuditSink> = match config.sink {
            AuditSinkKind::Tracing => Arc::new(TracingAuditSink),
            AuditSinkKind::File => Arc::new(FileAuditSink::new(config.dir.clone())),
            AuditSinkKind::Memory => Arc::new(MemoryAuditSink::new()),
        };
        Self::new(sink, config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records `event` and returns its audit id, or `None` when disabled.
    ///
    /// Sink failures are logged and dropped.
    pub async fn emit(
        &self,
        actor: &Actor,
        correlation_id: Option<&str>,
        event: AuditEvent,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let record = AuditRecord {
            audit_id: generate_ulid(),
            timestamp: Utc::now(),
            user_id: actor.user_id.clone(),
            session_id: actor.session_id.clone(),
            correlation_id: correlation_id.map(str::to_string),
            event,
        };
        if let Err(err) = self.sink.record(&record).await {
            tracing::warn!(
                audit_id = %record.audit_id,
                kind = ?record.event.kind(),
                error = %err,
                "Failed to record audit event"
            );
        }
        Some(record.audit_id)
    }
}
