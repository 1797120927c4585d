//! Graph mutation and grounded-answer flows.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::audit::{Actor, AuditEvent, AuditLog};
use super::generation::{GenerationRequest, TextGenerator};
use crate::context::Context;
use crate::error::AppError;
use crate::graph::GraphStore;
use crate::models::{generate_ulid, Edge, Node, ValidationResult, VersionMetadata, VersionType};
use crate::reasoning::{ConceptResolver, QueryRequest, ReasoningOrchestrator};
use crate::versioning::VersionManager;

/// Characters of document content kept on the document node.
const CONTENT_PREVIEW_CHARS: usize = 500;

/// Shorter tokens are not turned into concept nodes.
const MIN_CONCEPT_CHARS: usize = 3;

/// Id prefix of generated concept nodes.
const CONCEPT_PREFIX: &str = "concept:";

/// A document to ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Generated when absent.
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub source: Option<String>,
    /// Defaults to the ingestion time.
    pub timestamp: Option<String>,
    pub verified: Option<bool>,
}

/// Nodes and edges to add to an existing graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphUpdate {
    pub add_nodes: Vec<Node>,
    pub add_edges: Vec<Edge>,
    /// Recorded on the resulting version.
    pub version_type: Option<VersionType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub graph_id: String,
    pub version_id: String,
    pub documents: usize,
    /// Documents without content.
    pub skipped: usize,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// The updated graph; a new clone when a version label was given.
    pub graph_id: String,
    pub version_id: String,
}

/// A generated answer with its grounding evidence.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub model_id: String,
    pub validation: ValidationResult,
    pub subgraph_size: usize,
    /// Audit id of the query record, when auditing is enabled.
    pub query_event_id: Option<String>,
}

/// Service for building graphs from documents and answering queries over them.
#[derive(Clone)]
pub struct GraphService {
    store: Arc<dyn GraphStore>,
    resolver: Arc<dyn ConceptResolver>,
    orchestrator: Arc<ReasoningOrchestrator>,
    versions: VersionManager,
    audit: AuditLog,
    generator: Arc<dyn TextGenerator>,
    max_context_nodes: usize,
}

impl GraphService {
    pub fn new(ctx: &Context) -> Self {
        Self {
            store: ctx.store.clone(),
            resolver: ctx.resolver.clone(),
            orchestrator: ctx.orchestrator.clone(),
            versions: ctx.versions.clone(),
            audit: ctx.audit.clone(),
            generator: ctx.generator.clone(),
            max_context_nodes: ctx.config.generation.max_context_nodes,
        }
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    /// Builds a new graph from `documents` and records its first version.
    ///
    /// Each document becomes a `Document` node; each concept found in its
    /// content becomes a shared `Concept` node linked by a `MENTIONS` edge.
    pub async fn ingest_documents(
        &self,
        documents: Vec<Document>,
        metadata: VersionMetadata,
        label: Option<&str>,
        actor: &Actor,
    ) -> Result<IngestReport, AppError> {
        Self::check_label(label)?;
        Self::check_document_ids(&documents)?;
        let graph_id = format!("graph_{}", generate_ulid());
        tracing::info!(
            graph_id = %graph_id,
            documents = documents.len(),
            label = ?label,
            "Building graph from documents"
        );
        self.store.create_graph(&graph_id, &metadata).await?;

        let document_count = documents.len();
        let mut skipped = 0;
        let mut nodes = 0;
        let mut edges = 0;
        let mut concepts_seen = HashSet::new();

        for document in documents {
            if document.content.trim().is_empty() {
                skipped += 1;
                tracing::warn!(document_id = ?document.id, "Document has no content, skipping");
                continue;
            }

            let doc_node = Self::document_node(&document);
            let doc_id = doc_node.id.clone();
            self.store.add_node(&graph_id, doc_node).await?;
            nodes += 1;

            for concept in self.resolver.extract_concepts(&document.content) {
                if concept.chars().count() < MIN_CONCEPT_CHARS {
                    continue;
                }
                let concept_id = format!("{}{}", CONCEPT_PREFIX, concept);
                if concepts_seen.insert(concept_id.clone()) {
                    let node = Self::concept_node(&concept_id, &concept, &document);
                    self.store.add_node(&graph_id, node).await?;
                    nodes += 1;
                }
                self.store
                    .add_edge(&graph_id, Edge::new(doc_id.clone(), concept_id, "MENTIONS"))
                    .await?;
                edges += 1;
            }
        }

        let version_id = self
            .versions
            .create_version(&graph_id, metadata, label)
            .await?;

        self.audit
            .emit(
                actor,
                None,
                AuditEvent::GraphCreated {
                    graph_id: graph_id.clone(),
                    documents: document_count,
                    skipped,
                    nodes,
                    edges,
                },
            )
            .await;
        self.audit_versioned(actor, &graph_id, &version_id).await;

        tracing::info!(
            graph_id = %graph_id,
            version_id = %version_id,
            nodes,
            edges,
            skipped,
            "Graph built"
        );
        Ok(IngestReport {
            graph_id,
            version_id,
            documents: document_count,
            skipped,
            nodes,
            edges,
        })
    }

    /// Applies `update` to a graph and records a version.
    ///
    /// With `new_version`, the graph is first cloned to
    /// `<graph_id>_v<new_version>` and the update lands on the clone, which
    /// gets a version labeled `new_version`.
    ///
    /// Edge endpoints and the label are checked before anything is written.
    /// If a write still fails, a fresh clone is removed again; an in-place
    /// update may keep the nodes written before the failure.
    pub async fn update_graph(
        &self,
        graph_id: &str,
        update: GraphUpdate,
        new_version: Option<&str>,
        actor: &Actor,
    ) -> Result<UpdateReport, AppError> {
        Self::check_label(new_version)?;
        if !self.store.graph_exists(graph_id).await? {
            return Err(AppError::GraphNotFound(graph_id.to_string()));
        }
        self.check_endpoints(graph_id, &update).await?;

        let target = match new_version {
            Some(label) => {
                let target = format!("{}_v{}", graph_id, label);
                self.versions.check_label(&target, label).await?;
                self.store.clone_graph(graph_id, &target).await?;
                target
            }
            None => graph_id.to_string(),
        };
        tracing::info!(
            graph_id = %graph_id,
            target = %target,
            nodes = update.add_nodes.len(),
            edges = update.add_edges.len(),
            "Updating graph"
        );

        let nodes_added = update.add_nodes.len();
        let edges_added = update.add_edges.len();
        let applied = self
            .apply_update(graph_id, &target, update, new_version)
            .await;
        let version_id = match applied {
            Ok(version_id) => version_id,
            Err(err) => {
                if new_version.is_some() {
                    self.discard_clone(&target).await;
                }
                return Err(err);
            }
        };

        self.audit
            .emit(
                actor,
                None,
                AuditEvent::GraphUpdated {
                    graph_id: target.clone(),
                    source_graph_id: graph_id.to_string(),
                    nodes_added,
                    edges_added,
                },
            )
            .await;
        self.audit_versioned(actor, &target, &version_id).await;

        Ok(UpdateReport {
            graph_id: target,
            version_id,
        })
    }

    async fn apply_update(
        &self,
        source_id: &str,
        target: &str,
        update: GraphUpdate,
        label: Option<&str>,
    ) -> Result<String, AppError> {
        let mut metadata = VersionMetadata::new()
            .with_entry("source_graph_id", source_id)
            .with_entry("nodes_added", update.add_nodes.len())
            .with_entry("edges_added", update.add_edges.len());
        metadata.version_type = update.version_type;

        for node in update.add_nodes {
            self.store.add_node(target, node).await?;
        }
        for edge in update.add_edges {
            self.store.add_edge(target, edge).await?;
        }
        self.versions.create_version(target, metadata, label).await
    }

    /// Every edge endpoint must be an added node or already in the graph.
    async fn check_endpoints(&self, graph_id: &str, update: &GraphUpdate) -> Result<(), AppError> {
        let added: HashSet<&str> = update.add_nodes.iter().map(|n| n.id.as_str()).collect();
        let mut known = HashSet::new();
        for edge in &update.add_edges {
            for endpoint in [edge.source.as_str(), edge.target.as_str()] {
                if added.contains(endpoint) || known.contains(endpoint) {
                    continue;
                }
                if self.store.get_node(graph_id, endpoint).await?.is_none() {
                    return Err(AppError::NodeNotFound {
                        graph_id: graph_id.to_string(),
                        node_id: endpoint.to_string(),
                    });
                }
                known.insert(endpoint);
            }
        }
        Ok(())
    }

    async fn discard_clone(&self, target: &str) {
        match self.store.remove_graph(target).await {
            Ok(()) => tracing::warn!(graph_id = %target, "Update failed, removed partial clone"),
            Err(err) => tracing::error!(
                graph_id = %target,
                error = %err,
                "Update failed and the partial clone could not be removed"
            ),
        }
    }

    /// Answers a query from the validated subgraph around it.
    ///
    /// A subgraph that fails validation is still used, with a warning; the
    /// validation result travels with the answer.
    pub async fn answer(&self, request: QueryRequest, actor: &Actor) -> Result<Answer, AppError> {
        let query_event_id = self
            .audit
            .emit(
                actor,
                None,
                AuditEvent::Query {
                    graph_id: request.graph_id.clone(),
                    query: request.query.clone(),
                    filters: request.filters.clone(),
                },
            )
            .await;
        let correlation = query_event_id.as_deref();

        let query = request.query.clone();
        let outcome = self.orchestrator.applicable_subgraph(request).await?;

        self.audit
            .emit(
                actor,
                correlation,
                AuditEvent::SubgraphExtracted {
                    graph_id: outcome.graph_id.clone(),
                    node_ids: outcome.subgraph.node_ids().map(str::to_string).collect(),
                    edge_count: outcome.subgraph.edge_count(),
                },
            )
            .await;
        self.audit
            .emit(
                actor,
                correlation,
                AuditEvent::SubgraphValidated {
                    graph_id: outcome.graph_id.clone(),
                    is_valid: outcome.validation.is_valid,
                    groundedness_score: outcome.validation.groundedness_score,
                    issues: outcome.validation.issues.clone(),
                },
            )
            .await;

        if !outcome.validation.is_valid {
            tracing::warn!(
                graph_id = %outcome.graph_id,
                score = outcome.validation.groundedness_score,
                issues = ?outcome.validation.issues,
                "Subgraph failed validation, generating anyway"
            );
        }

        let context = outcome
            .subgraph
            .context_listing(Some(self.max_context_nodes));
        let generation = self
            .generator
            .generate(GenerationRequest { query, context })
            .await?;

        self.audit
            .emit(
                actor,
                correlation,
                AuditEvent::Response {
                    model_id: generation.model_id.clone(),
                    response_length: generation.text.chars().count(),
                },
            )
            .await;

        Ok(Answer {
            text: generation.text,
            model_id: generation.model_id,
            validation: outcome.validation,
            subgraph_size: outcome.subgraph.node_count(),
            query_event_id,
        })
    }

    async fn audit_versioned(&self, actor: &Actor, graph_id: &str, version_id: &str) {
        self.audit
            .emit(
                actor,
                None,
                AuditEvent::GraphVersioned {
                    graph_id: graph_id.to_string(),
                    version_id: version_id.to_string(),
                },
            )
            .await;
    }

    fn check_label(label: Option<&str>) -> Result<(), AppError> {
        match label {
            Some(label) if label.trim().is_empty() => Err(AppError::InvalidArgument(
                "version label must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Explicit document ids must be unique and must not look like concept ids.
    fn check_document_ids(documents: &[Document]) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        let explicit = documents
            .iter()
            .filter(|document| !document.content.trim().is_empty())
            .filter_map(|document| document.id.as_deref())
            .filter(|id| !id.trim().is_empty());
        for id in explicit {
            if id.starts_with(CONCEPT_PREFIX) {
                return Err(AppError::InvalidArgument(format!(
                    "document id '{}' uses the reserved '{}' prefix",
                    id, CONCEPT_PREFIX
                )));
            }
            if !seen.insert(id) {
                return Err(AppError::InvalidArgument(format!(
                    "duplicate document id '{}'",
                    id
                )));
            }
        }
        Ok(())
    }

    fn document_node(document: &Document) -> Node {
        let id = match &document.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => {
                let id = format!("doc_{}", generate_ulid());
                tracing::warn!(document_id = %id, "Document missing id, generated one");
                id
            }
        };
        let preview: String = document.content.chars().take(CONTENT_PREVIEW_CHARS).collect();

        let mut node = Node::new(id, "Document")
            .with_timestamp(Self::timestamp_of(document))
            .with_property("title", document.title.clone().unwrap_or_default())
            .with_property("content", preview)
            .with_property("content_length", document.content.chars().count());
        if let Some(source) = &document.source {
            node = node.with_source(source.clone());
        }
        if let Some(verified) = document.verified {
            node = node.with_verified(verified);
        }
        node
    }

    fn concept_node(id: &str, name: &str, document: &Document) -> Node {
        let mut node = Node::new(id, "Concept")
            .with_timestamp(Self::timestamp_of(document))
            .with_property("name", name);
        if let Some(source) = &document.source {
            node = node.with_source(source.clone());
        }
        if let Some(verified) = document.verified {
            node = node.with_verified(verified);
        }
        node
    }

    fn timestamp_of(document: &Document) -> String {
        document
            .timestamp
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339())
    }
}
