//! Graph reasoning: seed resolution, filtering, expansion and groundedness.

mod concepts;
mod expander;
mod filter;
mod groundedness;
mod orchestrator;

#[cfg(test)]
pub(crate) mod test_support;

pub use concepts::{ConceptResolver, KeywordResolver};
pub use expander::{Expansion, ExpansionStats, SubgraphExpander};
pub use filter::{FilterPipeline, Filters};
pub use groundedness::{CustomRule, GroundednessValidator, RuleKind, RuleOutcome, ValidationRule};
pub use orchestrator::{QueryRequest, ReasoningOrchestrator, ReasoningOutcome};
