//! Store fixtures for reasoning tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::{GraphStore, MemoryStore};
use crate::models::{Edge, Node, VersionMetadata};

/// Graph `g1`: a→b, b→c, c→d, a→c, plus isolated `e`.
pub async fn chain_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.create_graph("g1", &VersionMetadata::new()).await.unwrap();
    for id in ["a", "b", "c", "d", "e"] {
        store
            .add_node(
                "g1",
                Node::new(id, "Concept")
                    .with_source("wiki")
                    .with_timestamp("2024-01-01")
                    .with_verified(true)
                    .with_property("name", format!("term {}", id)),
            )
            .await
            .unwrap();
    }
    for (source, target) in [("a", "b"), ("b", "c"), ("c", "d"), ("a", "c")] {
        store
            .add_edge("g1", Edge::new(source, target, "LINKS"))
            .await
            .unwrap();
    }
    store
}

/// Wraps a [`MemoryStore`] with injected failures, latency and call counters.
pub struct FlakyStore {
    inner: MemoryStore,
    failing_nodes: HashSet<String>,
    failing_edges: HashSet<String>,
    fail_search: bool,
    latency: Option<Duration>,
    edge_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_nodes: HashSet::new(),
            failing_edges: HashSet::new(),
            fail_search: false,
            latency: None,
            edge_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Graph `g1`: `hub` linked to `leaf-0..n`.
    pub async fn star(leaves: usize) -> Self {
        let store = MemoryStore::new();
        store.create_graph("g1", &VersionMetadata::new()).await.unwrap();
        store.add_node("g1", Node::new("hub", "Concept")).await.unwrap();
        for i in 0..leaves {
            let leaf = format!("leaf-{}", i);
            store.add_node("g1", Node::new(leaf.clone(), "Concept")).await.unwrap();
            store
                .add_edge("g1", Edge::new("hub", leaf, "LINKS"))
                .await
                .unwrap();
        }
        Self::new(store)
    }

    pub fn failing_node(mut self, id: &str) -> Self {
        self.failing_nodes.insert(id.to_string());
        self
    }

    pub fn failing_edges(mut self, id: &str) -> Self {
        self.failing_edges.insert(id.to_string());
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn with_latency_ms(mut self, millis: u64) -> Self {
        self.latency = Some(Duration::from_millis(millis));
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn edge_calls(&self) -> usize {
        self.edge_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for FlakyStore {
    async fn search_nodes(&self, graph_id: &str, concept: &str) -> Result<Vec<Node>, AppError> {
        if self.fail_search {
            return Err(AppError::unavailable("graph store", "search timed out"));
        }
        self.inner.search_nodes(graph_id, concept).await
    }

    async fn get_node(&self, graph_id: &str, node_id: &str) -> Result<Option<Node>, AppError> {
        self.enter().await;
        let result = if self.failing_nodes.contains(node_id) {
            Err(AppError::unavailable("graph store", "connection reset"))
        } else {
            self.inner.get_node(graph_id, node_id).await
        };
        self.exit();
        result
    }

    async fn get_node_edges(&self, graph_id: &str, node_id: &str) -> Result<Vec<Edge>, AppError> {
        self.edge_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = if self.failing_edges.contains(node_id) {
            Err(AppError::unavailable("graph store", "connection reset"))
        } else {
            self.inner.get_node_edges(graph_id, node_id).await
        };
        self.exit();
        result
    }

    async fn graph_exists(&self, graph_id: &str) -> Result<bool, AppError> {
        self.inner.graph_exists(graph_id).await
    }

    async fn create_graph(
        &self,
        graph_id: &str,
        metadata: &VersionMetadata,
    ) -> Result<(), AppError> {
        self.inner.create_graph(graph_id, metadata).await
    }

    async fn add_node(&self, graph_id: &str, node: Node) -> Result<(), AppError> {
        self.inner.add_node(graph_id, node).await
    }

    async fn add_edge(&self, graph_id: &str, edge: Edge) -> Result<(), AppError> {
        self.inner.add_edge(graph_id, edge).await
    }

    async fn clone_graph(&self, source_id: &str, target_id: &str) -> Result<(), AppError> {
        self.inner.clone_graph(source_id, target_id).await
    }

    async fn remove_graph(&self, graph_id: &str) -> Result<(), AppError> {
        self.inner.remove_graph(graph_id).await
    }
}
