//! Text generation from a subgraph context listing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{GenerationBackend, GenerationConfig};
use crate::error::AppError;
use crate::reasoning::{ConceptResolver, KeywordResolver};

/// Answer returned when no context line mentions the query.
pub const INSUFFICIENT_CONTEXT: &str =
    "The provided context does not contain enough information to answer the question.";

/// Input to a [`TextGenerator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub query: String,
    /// Flat node/edge listing from [`Subgraph::context_listing`](crate::models::Subgraph::context_listing).
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub model_id: String,
}

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, AppError>;
}

/// Builds the backend selected in configuration.
pub fn generator_for(config: &GenerationConfig) -> Arc<dyn TextGenerator> {
    match config.backend {
        GenerationBackend::Extractive => Arc::new(ExtractiveGenerator::default()),
    }
}

/// Offline backend that answers with the context entries mentioning a query
/// concept.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator {
    resolver: KeywordResolver,
}

impl ExtractiveGenerator {
    pub const MODEL_ID: &'static str = "extractive-v1";

    fn mentions(line: &str, concepts: &[String]) -> bool {
        line.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .any(|token| concepts.iter().any(|c| c.eq_ignore_ascii_case(token)))
    }
}

#[async_trait]
impl TextGenerator for ExtractiveGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, AppError> {
        let concepts = self.resolver.extract_concepts(&request.query);
        let evidence: Vec<&str> = request
            .context
            .lines()
            .filter(|line| line.starts_with("- "))
            .filter(|line| Self::mentions(line, &concepts))
            .collect();

        let text = if evidence.is_empty() {
            INSUFFICIENT_CONTEXT.to_string()
        } else {
            format!("Based on the provided context:\n{}", evidence.join("\n"))
        };
        tracing::debug!(evidence = evidence.len(), "Generated extractive answer");

        Ok(Generation {
            text,
            model_id: Self::MODEL_ID.to_string(),
        })
    }
}
