//! Multi-signal confidence scoring for generated answers

use std::sync::Arc;

use super::grade::{GradeResponse, NEUTRAL_SCORE};
use crate::error::{Error, Result};
use crate::generation::prompt::{FAITHFULNESS_SYSTEM_PROMPT, RELEVANCY_SYSTEM_PROMPT};
use crate::generation::PromptBuilder;
use crate::providers::{ChatRequest, LlmProvider};
use crate::retrieval::RankedContext;
use crate::types::ConfidenceScores;

pub const RETRIEVAL_WEIGHT: f32 = 0.25;
pub const COVERAGE_WEIGHT: f32 = 0.15;
pub const FAITHFULNESS_WEIGHT: f32 = 0.35;
pub const RELEVANCY_WEIGHT: f32 = 0.25;

/// Scores one answer from retrieval similarity plus two model-graded checks
pub struct ConfidenceScorer {
    grader: Arc<dyn LlmProvider>,
    grader_model: String,
    coverage_threshold: f32,
}

impl ConfidenceScorer {
    pub fn new(grader: Arc<dyn LlmProvider>, grader_model: impl Into<String>, coverage_threshold: f32) -> Self {
        Self {
            grader,
            grader_model: grader_model.into(),
            coverage_threshold,
        }
    }

    /// Never fails: any internal failure yields `ConfidenceScores::neutral()`
    pub async fn score(&self, contexts: &[RankedContext], answer: &str, question: &str) -> ConfidenceScores {
        match self.try_score(contexts, answer, question).await {
            Ok(scores) => {
                tracing::info!(
                    "Confidence overall={} retrieval={} coverage={} faithfulness={} relevancy={}",
                    scores.overall,
                    scores.retrieval,
                    scores.coverage,
                    scores.faithfulness,
                    scores.relevancy
                );
                scores
            }
            Err(e) => {
                tracing::error!("Confidence scoring failed, using neutral scores: {}", e);
                ConfidenceScores::neutral()
            }
        }
    }

    async fn try_score(&self, contexts: &[RankedContext], answer: &str, question: &str) -> Result<ConfidenceScores> {
        let similarities: Vec<f32> = contexts.iter().map(|c| c.score).collect();

        let retrieval = if similarities.is_empty() {
            0.0
        } else {
            similarities.iter().sum::<f32>() / similarities.len() as f32
        };
        let covered = similarities.iter().filter(|s| **s > self.coverage_threshold).count();
        let coverage = covered as f32 / similarities.len().max(1) as f32;

        let (faithfulness, relevancy) = tokio::join!(
            self.grade(
                "faithfulness",
                FAITHFULNESS_SYSTEM_PROMPT,
                PromptBuilder::build_faithfulness_prompt(answer, contexts),
            ),
            self.grade(
                "relevancy",
                RELEVANCY_SYSTEM_PROMPT,
                PromptBuilder::build_relevancy_prompt(question, answer),
            ),
        );

        compose(retrieval, coverage, faithfulness, relevancy)
    }

    /// One graded sub-score; an unreachable grader or unparseable reply gives 0.5
    async fn grade(&self, what: &str, system: &str, user: String) -> f32 {
        let request = ChatRequest {
            model: self.grader_model.clone(),
            system: Some(system.to_string()),
            user,
            temperature: 0.0,
        };

        let graded = self
            .grader
            .complete(&request)
            .await
            .and_then(|raw| GradeResponse::parse(&raw).into_score());

        match graded {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!("{} grading degraded to {}: {}", what, NEUTRAL_SCORE, e);
                NEUTRAL_SCORE
            }
        }
    }
}

fn round3(value: f32) -> f32 {
    ((value as f64 * 1000.0).round() / 1000.0) as f32
}

/// Round each sub-score, then weight the rounded values
pub(crate) fn compose(retrieval: f32, coverage: f32, faithfulness: f32, relevancy: f32) -> Result<ConfidenceScores> {
    let parts = [retrieval, coverage, faithfulness, relevancy];
    if parts.iter().any(|v| !v.is_finite()) {
        return Err(Error::internal(format!("non-finite confidence component in {:?}", parts)));
    }

    let retrieval = round3(retrieval.clamp(0.0, 1.0));
    let coverage = round3(coverage.clamp(0.0, 1.0));
    let faithfulness = round3(faithfulness.clamp(0.0, 1.0));
    let relevancy = round3(relevancy.clamp(0.0, 1.0));

    let overall = RETRIEVAL_WEIGHT * retrieval
        + COVERAGE_WEIGHT * coverage
        + FAITHFULNESS_WEIGHT * faithfulness
        + RELEVANCY_WEIGHT * relevancy;

    Ok(ConfidenceScores {
        overall: round3(overall.clamp(0.0, 1.0)),
        retrieval,
        coverage,
        faithfulness,
        relevancy,
    })
}
