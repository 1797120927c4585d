//! Query-to-subgraph pipeline.
//!
//! Concept resolution, seed search, seed filtering, expansion and
//! validation run in that order under one deadline.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use super::concepts::ConceptResolver;
use super::expander::{ExpansionStats, SubgraphExpander};
use super::filter::{FilterPipeline, Filters};
use super::groundedness::GroundednessValidator;
use crate::config::ReasoningConfig;
use crate::error::AppError;
use crate::graph::GraphStore;
use crate::models::{Node, Subgraph, ValidationResult};

/// A query against one graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub graph_id: String,
    #[serde(default)]
    pub filters: Filters,
    /// Expansion depth; the configured default when absent.
    #[serde(default)]
    pub max_depth: Option<u32>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, graph_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            graph_id: graph_id.into(),
            ..Self::default()
        }
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Everything the pipeline produced for one query.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOutcome {
    pub graph_id: String,
    pub concepts: Vec<String>,
    /// Seed ids after filtering, in discovery order.
    pub seed_ids: Vec<String>,
    pub subgraph: Subgraph,
    pub validation: ValidationResult,
    pub stats: ExpansionStats,
}

pub struct ReasoningOrchestrator {
    store: Arc<dyn GraphStore>,
    resolver: Arc<dyn ConceptResolver>,
    expander: SubgraphExpander,
    validator: GroundednessValidator,
    config: ReasoningConfig,
}

impl ReasoningOrchestrator {
    pub fn new(
        store: Arc<dyn GraphStore>,
        resolver: Arc<dyn ConceptResolver>,
        validator: GroundednessValidator,
        config: ReasoningConfig,
    ) -> Self {
        Self {
            expander: SubgraphExpander::new(store.clone(), config.concurrency),
            store,
            resolver,
            validator,
            config,
        }
    }

    pub fn validator(&self) -> &GroundednessValidator {
        &self.validator
    }

    /// Resolves, filters, expands and validates the subgraph for `request`.
    ///
    /// Zero matching seeds is not an error: the outcome carries an empty,
    /// invalid subgraph. Expiry of the configured deadline abandons in-flight
    /// store calls and returns [`AppError::Timeout`].
    pub async fn applicable_subgraph(
        &self,
        request: QueryRequest,
    ) -> Result<ReasoningOutcome, AppError> {
        if request.query.trim().is_empty() {
            return Err(AppError::InvalidArgument("query must not be empty".into()));
        }
        let depth = self.resolve_depth(request.max_depth)?;
        let deadline = self.config.timeout();

        match tokio::time::timeout(deadline, self.run(&request, depth)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    graph_id = %request.graph_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "Query deadline exceeded"
                );
                Err(AppError::Timeout(deadline))
            }
        }
    }

    fn resolve_depth(&self, requested: Option<u32>) -> Result<u32, AppError> {
        let depth = requested.unwrap_or(self.config.max_depth);
        if depth > self.config.max_depth_limit {
            return Err(AppError::InvalidArgument(format!(
                "max_depth {} exceeds limit {}",
                depth, self.config.max_depth_limit
            )));
        }
        Ok(depth)
    }

    async fn run(&self, request: &QueryRequest, depth: u32) -> Result<ReasoningOutcome, AppError> {
        let graph_id = request.graph_id.as_str();
        let concepts = self.resolver.extract_concepts(&request.query);
        tracing::debug!(graph_id = %graph_id, concepts = ?concepts, "Resolved query concepts");

        let candidates = self.search_seeds(graph_id, &concepts).await?;
        let candidate_count = candidates.len();
        let seeds = FilterPipeline::apply(candidates, &request.filters);
        let seed_ids: Vec<String> = seeds.iter().map(|n| n.id.clone()).collect();

        let expansion = self.expander.expand_with_stats(graph_id, seeds, depth).await;
        if let Err(err) = expansion.subgraph.check_integrity() {
            tracing::error!(graph_id = %graph_id, error = %err, "Expanded subgraph failed integrity check");
            return Err(err);
        }

        let validation = self.validator.validate(&expansion.subgraph);
        tracing::info!(
            graph_id = %graph_id,
            candidates = candidate_count,
            seeds = seed_ids.len(),
            nodes = expansion.subgraph.node_count(),
            edges = expansion.subgraph.edge_count(),
            score = validation.groundedness_score,
            valid = validation.is_valid,
            "Reasoning complete"
        );

        Ok(ReasoningOutcome {
            graph_id: graph_id.to_string(),
            concepts,
            seed_ids,
            subgraph: expansion.subgraph,
            validation,
            stats: expansion.stats,
        })
    }

    /// Searches every concept and merges the hits, first occurrence wins.
    async fn search_seeds(&self, graph_id: &str, concepts: &[String]) -> Result<Vec<Node>, AppError> {
        let store = &self.store;
        let batches: Vec<Vec<Node>> = stream::iter(concepts)
            .map(|concept| store.search_nodes(graph_id, concept))
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        let mut seen = HashSet::new();
        Ok(batches
            .into_iter()
            .flatten()
            .filter(|node| seen.insert(node.id.clone()))
            .collect())
    }
}
