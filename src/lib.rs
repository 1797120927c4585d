//! Groundgraph - grounded subgraph reasoning over versioned semantic graphs
//!
//! Expands query concepts into depth-bounded subgraphs, scores how well they
//! are evidenced, and keeps a temporal version history per graph.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod models;
pub mod reasoning;
pub mod services;
pub mod versioning;
