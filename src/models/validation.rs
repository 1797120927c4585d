//! Groundedness validation results.

use serde::{Deserialize, Serialize};

/// Component scores behind a groundedness score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Mean fraction of provenance fields present per node.
    pub completeness: f64,
    /// Largest weakly-connected component over node count.
    pub connectivity: f64,
    /// Fraction of verified nodes.
    pub verification: f64,
}

/// Outcome of validating one subgraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Weighted groundedness score in `[0, 1]`.
    pub groundedness_score: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    /// Absent for empty subgraphs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl ValidationResult {
    /// Result for a subgraph without nodes.
    pub fn empty_subgraph() -> Self {
        Self {
            is_valid: false,
            groundedness_score: 0.0,
            issues: vec!["Empty subgraph".to_string()],
            warnings: Vec::new(),
            breakdown: None,
        }
    }
}
