//! Groundedness scoring and rule-based subgraph validation.
//!
//! The score is a weighted sum of three components, each in `[0, 1]`:
//!
//! - **completeness**: mean fraction of `{source, timestamp}` present per node
//! - **connectivity**: largest weakly-connected component over node count
//! - **verification**: fraction of nodes with `verified = true`
//!
//! A subgraph is valid when the score reaches the threshold and every
//! configured [`ValidationRule`] passes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{GroundednessConfig, GroundednessWeights};
use crate::models::{ScoreBreakdown, Subgraph, ValidationResult};

/// Result of evaluating one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub issues: Vec<String>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            issues: Vec::new(),
        }
    }

    pub fn fail(issue: impl Into<String>) -> Self {
        Self {
            passed: false,
            issues: vec![issue.into()],
        }
    }
}

/// A rule implemented in code rather than configuration.
#[derive(Clone, Copy)]
pub struct CustomRule(pub fn(&Subgraph) -> RuleOutcome);

impl std::fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CustomRule(..)")
    }
}

/// The kinds of validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// At least `min` nodes.
    MinNodes { min: usize },
    /// Each listed type appears at least once.
    RequiredNodeTypes { types: Vec<String> },
    /// No node's `valid_until` lies before the validation instant.
    NoExpiredNodes,
    /// Verified fraction is at least `min_fraction`.
    VerifiedSources { min_fraction: f64 },
    /// Every edge endpoint is a node of the subgraph.
    NoDanglingEdges,
    /// Code-defined check; not loadable from configuration.
    #[serde(skip)]
    Custom(CustomRule),
}

/// A named validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    pub name: String,
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl ValidationRule {
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn custom(name: impl Into<String>, check: fn(&Subgraph) -> RuleOutcome) -> Self {
        Self::new(name, RuleKind::Custom(CustomRule(check)))
    }

    /// Evaluates the rule against `subgraph` as of `at`.
    pub fn evaluate(&self, subgraph: &Subgraph, at: DateTime<Utc>) -> RuleOutcome {
        match &self.kind {
            RuleKind::MinNodes { min } => {
                if subgraph.node_count() >= *min {
                    RuleOutcome::pass()
                } else {
                    RuleOutcome::fail(format!(
                        "Subgraph has {} nodes, at least {} required",
                        subgraph.node_count(),
                        min
                    ))
                }
            }
            RuleKind::RequiredNodeTypes { types } => {
                let issues: Vec<String> = types
                    .iter()
                    .filter(|t| !subgraph.nodes().any(|n| &n.node_type == *t))
                    .map(|t| format!("No node of required type '{}'", t))
                    .collect();
                RuleOutcome {
                    passed: issues.is_empty(),
                    issues,
                }
            }
            RuleKind::NoExpiredNodes => {
                let issues: Vec<String> = subgraph
                    .nodes()
                    .filter(|n| n.properties.valid_until.is_some_and(|until| until < at))
                    .map(|n| format!("Node '{}' expired before validation time", n.id))
                    .collect();
                RuleOutcome {
                    passed: issues.is_empty(),
                    issues,
                }
            }
            RuleKind::VerifiedSources { min_fraction } => {
                let fraction = verification_score(subgraph);
                if fraction >= *min_fraction {
                    RuleOutcome::pass()
                } else {
                    RuleOutcome::fail(format!(
                        "Verified fraction {:.2} below required {:.2}",
                        fraction, min_fraction
                    ))
                }
            }
            RuleKind::NoDanglingEdges => {
                let issues: Vec<String> = subgraph
                    .dangling_edges()
                    .map(|e| {
                        format!(
                            "Edge {} -[{}]-> {} has an endpoint outside the subgraph",
                            e.source, e.edge_type, e.target
                        )
                    })
                    .collect();
                RuleOutcome {
                    passed: issues.is_empty(),
                    issues,
                }
            }
            RuleKind::Custom(CustomRule(check)) => check(subgraph),
        }
    }
}

/// Scores subgraphs and applies validation rules.
#[derive(Debug, Clone)]
pub struct GroundednessValidator {
    threshold: f64,
    weights: GroundednessWeights,
    rules: Vec<ValidationRule>,
}

impl Default for GroundednessValidator {
    fn default() -> Self {
        Self::new(&GroundednessConfig::default())
    }
}

impl GroundednessValidator {
    pub fn new(config: &GroundednessConfig) -> Self {
        Self {
            threshold: config.threshold,
            weights: config.weights,
            rules: config.rules.clone(),
        }
    }

    /// Appends a rule after the configured ones.
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Validates `subgraph` as of now.
    pub fn validate(&self, subgraph: &Subgraph) -> ValidationResult {
        self.validate_at(subgraph, Utc::now())
    }

    /// Validates `subgraph` as of `at`.
    pub fn validate_at(&self, subgraph: &Subgraph, at: DateTime<Utc>) -> ValidationResult {
        if subgraph.is_empty() {
            return ValidationResult::empty_subgraph();
        }

        let (connectivity, components) = connectivity_score(subgraph);
        let breakdown = ScoreBreakdown {
            completeness: completeness_score(subgraph),
            connectivity,
            verification: verification_score(subgraph),
        };
        let score = self.combine(&breakdown);

        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut rules_passed = true;

        if score < self.threshold {
            issues.push(format!(
                "Groundedness score {:.2} below threshold {}",
                score, self.threshold
            ));
        }

        for rule in &self.rules {
            let outcome = rule.evaluate(subgraph, at);
            if outcome.passed {
                continue;
            }
            rules_passed = false;
            if outcome.issues.is_empty() {
                issues.push(format!("[{}] rule failed", rule.name));
            }
            issues.extend(
                outcome
                    .issues
                    .into_iter()
                    .map(|issue| format!("[{}] {}", rule.name, issue)),
            );
        }

        let incomplete = subgraph
            .nodes()
            .filter(|n| n.properties.provenance_fields_present() < 2)
            .count();
        if incomplete > 0 {
            warnings.push(format!(
                "{} of {} nodes missing source or timestamp metadata",
                incomplete,
                subgraph.node_count()
            ));
        }
        if components > 1 {
            warnings.push(format!(
                "Subgraph has {} disconnected components",
                components
            ));
        }
        for edge in subgraph.dangling_edges() {
            warnings.push(format!(
                "Edge {} -[{}]-> {} references a node outside the subgraph",
                edge.source, edge.edge_type, edge.target
            ));
        }

        ValidationResult {
            is_valid: score >= self.threshold && rules_passed,
            groundedness_score: score,
            issues,
            warnings,
            breakdown: Some(breakdown),
        }
    }

    fn combine(&self, breakdown: &ScoreBreakdown) -> f64 {
        let w = self.weights;
        let score = w.completeness * breakdown.completeness
            + w.connectivity * breakdown.connectivity
            + w.verification * breakdown.verification;
        score.clamp(0.0, 1.0)
    }
}

fn completeness_score(subgraph: &Subgraph) -> f64 {
    let total: f64 = subgraph
        .nodes()
        .map(|n| n.properties.provenance_fields_present() as f64 / 2.0)
        .sum();
    total / subgraph.node_count() as f64
}

fn verification_score(subgraph: &Subgraph) -> f64 {
    if subgraph.is_empty() {
        return 0.0;
    }
    let verified = subgraph.nodes().filter(|n| n.is_verified()).count();
    verified as f64 / subgraph.node_count() as f64
}

/// Returns the connectivity score and the number of weakly-connected components.
fn connectivity_score(subgraph: &Subgraph) -> (f64, usize) {
    let index: HashMap<&str, usize> = subgraph
        .node_ids()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();
    let mut components = DisjointSet::new(index.len());

    for edge in subgraph.edges() {
        if let (Some(&a), Some(&b)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            components.union(a, b);
        }
    }

    let sizes = components.sizes();
    let largest = sizes.iter().copied().max().unwrap_or(0);
    let count = sizes.len();
    if count <= 1 {
        (1.0, count)
    } else {
        (largest as f64 / index.len() as f64, count)
    }
}

/// Union-find over node indices.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }

    /// Sizes of every component.
    fn sizes(&mut self) -> Vec<usize> {
        let roots: Vec<usize> = (0..self.parent.len())
            .filter(|&i| self.find(i) == i)
            .collect();
        roots.into_iter().map(|root| self.size[root]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, Node};
    use chrono::Duration;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn grounded(id: &str) -> Node {
        Node::new(id, "Concept")
            .with_source("s")
            .with_timestamp("t")
            .with_verified(true)
    }

    #[test]
    fn test_empty_subgraph_is_invalid() {
        let result = GroundednessValidator::default().validate(&Subgraph::new());
        assert!(!result.is_valid);
        assert_eq!(result.groundedness_score, 0.0);
        assert_eq!(result.issues, vec!["Empty subgraph"]);
        assert!(result.breakdown.is_none());
    }

    #[test]
    fn test_partially_grounded_pair_scores_below_threshold() {
        let subgraph = Subgraph::from_parts(
            vec![grounded("n1"), Node::new("n2", "Concept").with_verified(false)],
            vec![Edge::new("n1", "n2", "RELATED_TO")],
        );

        let result = GroundednessValidator::default().validate(&subgraph);
        let breakdown = result.breakdown.unwrap();
        assert!(approx(breakdown.completeness, 0.5));
        assert!(approx(breakdown.connectivity, 1.0));
        assert!(approx(breakdown.verification, 0.5));
        assert!(approx(result.groundedness_score, 0.65));
        assert!(!result.is_valid);
        assert_eq!(result.issues, vec!["Groundedness score 0.65 below threshold 0.7"]);
    }

    #[test]
    fn test_fully_grounded_subgraph_is_valid() {
        let subgraph = Subgraph::from_parts(
            vec![grounded("a"), grounded("b")],
            vec![Edge::new("a", "b", "RELATED_TO")],
        );
        let result = GroundednessValidator::default().validate(&subgraph);
        assert!(result.is_valid);
        assert!(approx(result.groundedness_score, 1.0));
        assert!(result.issues.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_connectivity_uses_largest_component() {
        let subgraph = Subgraph::from_parts(
            vec![grounded("a"), grounded("b"), grounded("c"), grounded("d")],
            vec![Edge::new("a", "b", "R"), Edge::new("c", "b", "R")],
        );
        let result = GroundednessValidator::default().validate(&subgraph);
        let breakdown = result.breakdown.unwrap();
        assert!(approx(breakdown.connectivity, 0.75));
        assert!(approx(result.groundedness_score, 0.4 + 0.3 * 0.75 + 0.3));
        assert!(result
            .warnings
            .contains(&"Subgraph has 2 disconnected components".to_string()));
    }

    #[test]
    fn test_disjoint_set_component_sizes() {
        let mut set = DisjointSet::new(6);
        set.union(0, 1);
        set.union(2, 1);
        set.union(4, 5);
        let mut sizes = set.sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2, 3]);
    }

    #[test]
    fn test_single_node_is_connected() {
        let subgraph = Subgraph::from_parts(vec![grounded("solo")], Vec::new());
        let result = GroundednessValidator::default().validate(&subgraph);
        assert!(approx(result.breakdown.unwrap().connectivity, 1.0));
        assert!(result.is_valid);
    }

    #[test]
    fn test_score_stays_in_unit_interval_with_heavy_weights() {
        let config = GroundednessConfig {
            weights: GroundednessWeights {
                completeness: 2.0,
                connectivity: 2.0,
                verification: 2.0,
            },
            ..GroundednessConfig::default()
        };
        let subgraph = Subgraph::from_parts(vec![grounded("a")], Vec::new());
        let result = GroundednessValidator::new(&config).validate(&subgraph);
        assert!(approx(result.groundedness_score, 1.0));
    }

    #[test]
    fn test_failing_rule_overrides_score() {
        let validator = GroundednessValidator::default()
            .with_rule(ValidationRule::new("non-trivial", RuleKind::MinNodes { min: 3 }))
            .with_rule(ValidationRule::new(
                "has-docs",
                RuleKind::RequiredNodeTypes {
                    types: vec!["Concept".to_string(), "Document".to_string()],
                },
            ));
        let subgraph = Subgraph::from_parts(
            vec![grounded("a"), grounded("b")],
            vec![Edge::new("a", "b", "R")],
        );

        let result = validator.validate(&subgraph);
        assert!(approx(result.groundedness_score, 1.0));
        assert!(!result.is_valid);
        assert_eq!(
            result.issues,
            vec![
                "[non-trivial] Subgraph has 2 nodes, at least 3 required",
                "[has-docs] No node of required type 'Document'",
            ]
        );
    }

    #[test]
    fn test_no_expired_nodes_rule() {
        let now = Utc::now();
        let validator = GroundednessValidator::default()
            .with_rule(ValidationRule::new("fresh", RuleKind::NoExpiredNodes));
        let subgraph = Subgraph::from_parts(
            vec![
                grounded("old").with_valid_until(now - Duration::days(1)),
                grounded("new").with_valid_until(now + Duration::days(1)),
            ],
            vec![Edge::new("old", "new", "R")],
        );

        let result = validator.validate_at(&subgraph, now);
        assert!(!result.is_valid);
        assert_eq!(
            result.issues,
            vec!["[fresh] Node 'old' expired before validation time"]
        );
    }

    #[test]
    fn test_custom_rule_without_issues() {
        fn always_fails(_: &Subgraph) -> RuleOutcome {
            RuleOutcome {
                passed: false,
                issues: Vec::new(),
            }
        }
        let validator =
            GroundednessValidator::default().with_rule(ValidationRule::custom("strict", always_fails));
        let subgraph = Subgraph::from_parts(vec![grounded("a")], Vec::new());

        let result = validator.validate(&subgraph);
        assert!(!result.is_valid);
        assert_eq!(result.issues, vec!["[strict] rule failed"]);
    }

    #[test]
    fn test_dangling_edges_warn_and_rule() {
        let validator = GroundednessValidator::default()
            .with_rule(ValidationRule::new("closed", RuleKind::NoDanglingEdges));
        let subgraph = Subgraph::from_parts(
            vec![grounded("a")],
            vec![Edge::new("a", "ghost", "R")],
        );

        let result = validator.validate(&subgraph);
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].starts_with("[closed] Edge a -[R]-> ghost"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("references a node outside the subgraph")));
    }

    #[test]
    fn test_rule_deserialization() {
        let rule: ValidationRule = serde_json::from_value(serde_json::json!({
            "name": "verified",
            "kind": "verified_sources",
            "min_fraction": 0.5
        }))
        .unwrap();
        assert_eq!(rule.name, "verified");
        assert!(matches!(
            rule.kind,
            RuleKind::VerifiedSources { min_fraction } if min_fraction == 0.5
        ));
    }
}
