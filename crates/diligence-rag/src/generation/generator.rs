//! Grounded answer generation

use std::sync::Arc;

use super::citation::extract_citations;
use super::prompt::{PromptBuilder, ANALYST_SYSTEM_PROMPT};
use crate::error::Result;
use crate::providers::{ChatRequest, LlmProvider};
use crate::retrieval::RankedContext;
use crate::types::Citation;

/// Answer text plus the contexts it actually cited
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Prompts the language model and derives citations from its answer
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Generate an answer from the ranked contexts. Zero contexts still
    /// produce a model answer, normally the not-found phrase.
    pub async fn generate(
        &self,
        question: &str,
        contexts: &[RankedContext],
        model: &str,
    ) -> Result<GeneratedAnswer> {
        let request = ChatRequest {
            model: model.to_string(),
            system: Some(ANALYST_SYSTEM_PROMPT.to_string()),
            user: PromptBuilder::build_answer_prompt(question, contexts),
            temperature: self.temperature,
        };

        tracing::info!(
            "Generating answer with {} via {} from {} context(s)",
            model,
            self.llm.name(),
            contexts.len()
        );

        let text = self.llm.complete(&request).await?;
        let citations = extract_citations(&text, contexts);

        tracing::info!("Generated answer with {} citations", citations.len());
        Ok(GeneratedAnswer { text, citations })
    }
}
