//! Breadth-first subgraph expansion over a [`GraphStore`].
//!
//! Each level fans out over the whole frontier: first every frontier node's
//! incident edges are fetched, then every newly discovered neighbor. Both
//! phases run with at most `concurrency` store calls in flight, and a level
//! finishes completely before the next one starts.
//!
//! A failed lookup skips that node (or that node's edges) with a warning;
//! the expansion itself never fails.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::models::{Node, Subgraph};

/// Counters collected during one expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionStats {
    /// Levels actually processed (at most the requested depth).
    pub levels: u32,
    /// Nodes fetched beyond the seeds.
    pub nodes_fetched: usize,
    /// Store lookups that failed and were skipped.
    pub fetch_failures: usize,
    /// Edges dropped because an endpoint could not be fetched.
    pub edges_pruned: usize,
}

/// A finished expansion.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub subgraph: Subgraph,
    pub stats: ExpansionStats,
}

/// Expands seed nodes into a depth-bounded connected subgraph.
#[derive(Clone)]
pub struct SubgraphExpander {
    store: Arc<dyn GraphStore>,
    concurrency: usize,
}

impl SubgraphExpander {
    pub fn new(store: Arc<dyn GraphStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Expands `seeds` up to `max_depth` levels. Depth 0 returns the seeds alone.
    pub async fn expand(&self, graph_id: &str, seeds: Vec<Node>, max_depth: u32) -> Subgraph {
        self.expand_with_stats(graph_id, seeds, max_depth)
            .await
            .subgraph
    }

    /// Like [`expand`](Self::expand), also returning traversal counters.
    pub async fn expand_with_stats(
        &self,
        graph_id: &str,
        seeds: Vec<Node>,
        max_depth: u32,
    ) -> Expansion {
        let mut subgraph = Subgraph::new();
        let mut stats = ExpansionStats::default();

        let mut frontier: Vec<String> = Vec::new();
        for seed in seeds {
            let id = seed.id.clone();
            if subgraph.insert_node(seed) {
                frontier.push(id);
            }
        }

        while stats.levels < max_depth && !frontier.is_empty() {
            stats.levels += 1;

            let pending = self
                .collect_level_edges(graph_id, &frontier, &mut subgraph, &mut stats)
                .await;
            frontier = self
                .fetch_neighbors(graph_id, pending, &mut subgraph, &mut stats)
                .await;

            tracing::debug!(
                graph_id = %graph_id,
                level = stats.levels,
                next_frontier = frontier.len(),
                nodes = subgraph.node_count(),
                edges = subgraph.edge_count(),
                "Expansion level complete"
            );
        }

        stats.edges_pruned = subgraph.retain_resolved_edges();
        if stats.edges_pruned > 0 {
            tracing::debug!(
                graph_id = %graph_id,
                pruned = stats.edges_pruned,
                "Dropped edges to unreachable nodes"
            );
        }

        Expansion { subgraph, stats }
    }

    /// Records every incident edge of the frontier and returns the unseen
    /// neighbor ids in discovery order.
    async fn collect_level_edges(
        &self,
        graph_id: &str,
        frontier: &[String],
        subgraph: &mut Subgraph,
        stats: &mut ExpansionStats,
    ) -> Vec<String> {
        let store = &self.store;
        let results: Vec<_> = stream::iter(frontier)
            .map(|node_id| async move { (node_id, store.get_node_edges(graph_id, node_id).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for (node_id, result) in results {
            let edges = match result {
                Ok(edges) => edges,
                Err(err) => {
                    stats.fetch_failures += 1;
                    tracing::warn!(
                        graph_id = %graph_id,
                        node_id = %node_id,
                        error = %err,
                        "Failed to fetch node edges, skipping"
                    );
                    continue;
                }
            };

            for edge in edges {
                let neighbor = edge.other_endpoint(node_id);
                if !subgraph.contains_node(neighbor) && seen.insert(neighbor.to_string()) {
                    pending.push(neighbor.to_string());
                }
                subgraph.push_edge(edge);
            }
        }
        pending
    }

    /// Fetches pending neighbors, adds the ones found, and returns them as the
    /// next frontier.
    async fn fetch_neighbors(
        &self,
        graph_id: &str,
        pending: Vec<String>,
        subgraph: &mut Subgraph,
        stats: &mut ExpansionStats,
    ) -> Vec<String> {
        let store = &self.store;
        let results: Vec<_> = stream::iter(pending)
            .map(|node_id| async move {
                let result = store.get_node(graph_id, &node_id).await;
                (node_id, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut next = Vec::new();
        for (node_id, result) in results {
            match result {
                Ok(Some(node)) if node.id == node_id => {
                    if subgraph.insert_node(node) {
                        stats.nodes_fetched += 1;
                        next.push(node_id);
                    }
                }
                Ok(Some(node)) => {
                    stats.fetch_failures += 1;
                    tracing::warn!(
                        graph_id = %graph_id,
                        requested = %node_id,
                        returned = %node.id,
                        "Store returned a different node, skipping"
                    );
                }
                Ok(None) => {
                    tracing::debug!(
                        graph_id = %graph_id,
                        node_id = %node_id,
                        "Edge endpoint not present in store"
                    );
                }
                Err(err) => {
                    stats.fetch_failures += 1;
                    tracing::warn!(
                        graph_id = %graph_id,
                        node_id = %node_id,
                        error = %err,
                        "Failed to fetch node, skipping"
                    );
                }
            }
        }
        next
    }
}
