//! End-to-end tests: ingest, snapshot, query and version bookkeeping.

use std::sync::Arc;

use chrono::{Duration, Utc};
use groundgraph::config::Config;
use groundgraph::context::Context;
use groundgraph::error::{AppError, ErrorKind};
use groundgraph::graph::{Backend, GraphStore, MemoryStore};
use groundgraph::models::{Edge, Node, VersionMetadata, VersionType};
use groundgraph::reasoning::{Filters, QueryRequest};
use groundgraph::services::{
    Actor, AuditEventKind, AuditFilter, AuditLog, Document, GraphService, GraphUpdate,
    MemoryAuditSink,
};

fn document(id: &str, content: &str, source: &str) -> Document {
    Document {
        id: Some(id.to_string()),
        title: Some(id.to_uppercase()),
        content: content.to_string(),
        source: Some(source.to_string()),
        timestamp: Some("2025-01-01T00:00:00Z".to_string()),
        verified: Some(true),
    }
}

fn context(store: Arc<MemoryStore>, sink: Arc<MemoryAuditSink>) -> Context {
    Context::with_backend(Config::default(), Backend::Memory(store))
        .with_audit(AuditLog::new(sink, true))
}

#[tokio::test]
async fn test_ingest_snapshot_and_query_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("store.json");

    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(MemoryAuditSink::new());
    let ctx = context(store, sink.clone());
    let service = GraphService::new(&ctx);

    let report = service
        .ingest_documents(
            vec![
                document("tokio", "Tokio schedules async tasks", "docs"),
                document("futures", "Futures compose async work", "blog"),
            ],
            VersionMetadata::new(),
            None,
            &Actor::default(),
        )
        .await
        .unwrap();
    ctx.backend.persist(&snapshot).await.unwrap();

    // A fresh store loaded from the snapshot answers the same query.
    let reloaded = Arc::new(MemoryStore::load_snapshot(&snapshot).await.unwrap());
    let ctx = context(reloaded, Arc::new(MemoryAuditSink::new()));
    let outcome = ctx
        .orchestrator
        .applicable_subgraph(QueryRequest::new("async", &report.graph_id).with_max_depth(1))
        .await
        .unwrap();

    assert_eq!(outcome.seed_ids, vec!["concept:async", "futures", "tokio"]);
    assert!(outcome.subgraph.contains_node("concept:tasks"));
    assert!(outcome.subgraph.contains_node("concept:work"));
    assert!(outcome.validation.is_valid);
    assert!(outcome.subgraph.check_integrity().is_ok());
}

#[tokio::test]
async fn test_source_filter_narrows_seeds() {
    let store = Arc::new(MemoryStore::new());
    let ctx = context(store, Arc::new(MemoryAuditSink::new()));
    let service = GraphService::new(&ctx);
    let report = service
        .ingest_documents(
            vec![
                document("tokio", "Tokio schedules async tasks", "docs"),
                document("futures", "Futures compose async work", "blog"),
            ],
            VersionMetadata::new(),
            None,
            &Actor::default(),
        )
        .await
        .unwrap();

    let filters = Filters::from_value(serde_json::json!({
        "node_types": ["Document"],
        "sources": ["docs"],
    }))
    .unwrap();
    let outcome = ctx
        .orchestrator
        .applicable_subgraph(
            QueryRequest::new("async", &report.graph_id)
                .with_filters(filters)
                .with_max_depth(0),
        )
        .await
        .unwrap();
    assert_eq!(outcome.seed_ids, vec!["tokio"]);
    assert_eq!(outcome.subgraph.node_count(), 1);
}

#[tokio::test]
async fn test_expired_nodes_are_filtered_out() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store.create_graph("g", &VersionMetadata::new()).await.unwrap();
    store
        .add_node(
            "g",
            Node::new("stale", "Concept")
                .with_property("name", "policy")
                .with_valid_until(now - Duration::days(1)),
        )
        .await
        .unwrap();
    store
        .add_node("g", Node::new("current", "Concept").with_property("name", "policy"))
        .await
        .unwrap();
    store
        .add_edge("g", Edge::new("stale", "current", "SUPERSEDED_BY"))
        .await
        .unwrap();

    let ctx = context(store, Arc::new(MemoryAuditSink::new()));
    let filters = Filters {
        valid_until: Some(now),
        ..Filters::default()
    };
    let outcome = ctx
        .orchestrator
        .applicable_subgraph(QueryRequest::new("policy", "g").with_filters(filters).with_max_depth(0))
        .await
        .unwrap();
    assert_eq!(outcome.seed_ids, vec!["current"]);
}

#[tokio::test]
async fn test_versions_across_updates() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(MemoryAuditSink::new());
    let ctx = context(store, sink.clone());
    let service = GraphService::new(&ctx);
    let actor = Actor::default();

    let report = service
        .ingest_documents(
            vec![document("d1", "graph versioning", "docs")],
            VersionMetadata::new().with_expires_at(Utc::now() + Duration::days(30)),
            Some("baseline"),
            &actor,
        )
        .await
        .unwrap();
    let graph_id = report.graph_id.clone();

    service
        .update_graph(
            &graph_id,
            GraphUpdate {
                add_nodes: vec![Node::new("n1", "Concept")],
                add_edges: vec![Edge::new("d1", "n1", "MENTIONS")],
                ..GraphUpdate::default()
            },
            None,
            &actor,
        )
        .await
        .unwrap();

    let versions = ctx.versions.clone();
    let history = versions.list_versions(&graph_id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version_id, "baseline");
    assert_eq!(history[1].version_number, 2);
    assert!(history[0].created_at < history[1].created_at);

    let diff = versions
        .compare_versions(&graph_id, "baseline", &history[1].version_id)
        .await
        .unwrap();
    assert_eq!(diff.metadata.removed, vec!["expires_at"]);
    assert_eq!(
        diff.metadata.added,
        vec!["edges_added", "nodes_added", "source_graph_id"]
    );

    let later = Utc::now() + Duration::days(60);
    assert!(versions.is_temporally_valid(&graph_id, "baseline", None).await);
    assert!(!versions.is_temporally_valid(&graph_id, "baseline", Some(later)).await);

    let updated = sink
        .events(&AuditFilter {
            kind: Some(AuditEventKind::GraphUpdated),
            ..AuditFilter::default()
        })
        .await;
    assert_eq!(updated.len(), 1);
    let versioned = sink
        .events(&AuditFilter {
            kind: Some(AuditEventKind::GraphVersioned),
            ..AuditFilter::default()
        })
        .await;
    assert_eq!(versioned.len(), 2);
}

#[tokio::test]
async fn test_error_taxonomy_at_the_surface() {
    let store = Arc::new(MemoryStore::new());
    let ctx = context(store, Arc::new(MemoryAuditSink::new()));
    let service = GraphService::new(&ctx);

    let err = service
        .answer(QueryRequest::new("anything", "missing"), &Actor::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.is_user_facing());

    let err = ctx
        .versions
        .get_version("missing", Some("v1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VersionNotFound { .. }));

    let err = Filters::from_value(serde_json::json!({"sources": 42})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_version_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.store.snapshot = Some(dir.path().join("graphs.json"));
    config.audit.enabled = false;

    let ctx = Context::new(config.clone()).await.unwrap();
    let service = GraphService::new(&ctx);
    let report = service
        .ingest_documents(
            vec![document("d1", "durable versions", "docs")],
            VersionMetadata::new().with_version_type(VersionType::Major),
            Some("first"),
            &Actor::default(),
        )
        .await
        .unwrap();
    ctx.backend
        .persist(config.store.snapshot.as_ref().unwrap())
        .await
        .unwrap();
    assert!(dir.path().join("graphs.versions.json").exists());
    drop(service);
    drop(ctx);

    let ctx = Context::new(config).await.unwrap();
    let service = GraphService::new(&ctx);
    let updated = service
        .update_graph(
            &report.graph_id,
            GraphUpdate {
                add_nodes: vec![Node::new("n1", "Concept")],
                add_edges: vec![Edge::new("d1", "n1", "MENTIONS")],
                version_type: Some(VersionType::Patch),
            },
            None,
            &Actor::default(),
        )
        .await
        .unwrap();

    let history = ctx.versions.list_versions(&report.graph_id).await;
    let ids: Vec<_> = history.iter().map(|v| v.version_id.as_str()).collect();
    assert_eq!(ids, vec!["first", updated.version_id.as_str()]);
    assert_eq!(history[1].version_number, 2);

    let diff = ctx
        .versions
        .compare_versions(&report.graph_id, "first", &updated.version_id)
        .await
        .unwrap();
    assert_eq!(diff.metadata.changed, vec!["version_type"]);
}
