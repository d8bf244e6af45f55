//! Offline comparison of generated answers with reference answers

use serde::{Deserialize, Serialize};

use super::lexical::{bleu, normalize, rouge_l, rouge_n, tokenize};
use crate::error::{Error, Result};
use crate::providers::Embedder;
use crate::retrieval::cosine_similarity;

const NGRAM_WEIGHT: f64 = 0.25;
const LCS_WEIGHT: f64 = 0.25;
const SEMANTIC_WEIGHT: f64 = 0.5;

/// Per-answer metrics, each in [0, 1] and rounded to 4 decimals.
/// `None` means the metric could not be computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Sentence BLEU over 1..4-grams
    pub ngram_overlap: Option<f64>,
    /// ROUGE-1 F1
    pub unigram_f1: Option<f64>,
    /// ROUGE-2 F1
    pub bigram_f1: Option<f64>,
    /// ROUGE-L F1
    pub lcs_f1: Option<f64>,
    /// Cosine similarity of the two texts' embeddings
    pub semantic_similarity: Option<f64>,
    /// Weighted mean over whichever of n-gram, LCS and semantic were computed
    pub overall: Option<f64>,
}

/// Result of evaluating one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Metrics(EvaluationMetrics),
    /// The question has no reference answer; nothing was scored
    NoGroundTruth,
}

/// Lexical plus optional semantic evaluator
#[derive(Clone, Default)]
pub struct Evaluator {
    embedder: Option<Embedder>,
}

impl Evaluator {
    /// Lexical metrics only
    pub fn lexical() -> Self {
        Self { embedder: None }
    }

    pub fn with_embedder(embedder: Embedder) -> Self {
        Self {
            embedder: Some(embedder),
        }
    }

    /// Each metric is computed independently; a failing one is absent, never zero
    pub async fn evaluate(&self, generated: &str, reference: &str) -> EvaluationMetrics {
        let generated = normalize(generated);
        let reference = normalize(reference);
        let gen_tokens = tokenize(&generated);
        let ref_tokens = tokenize(&reference);

        let ngram_overlap = isolate("n-gram overlap", Ok(bleu(&gen_tokens, &ref_tokens)));
        let unigram_f1 = isolate("unigram F1", Ok(rouge_n(&gen_tokens, &ref_tokens, 1)));
        let bigram_f1 = isolate("bigram F1", Ok(rouge_n(&gen_tokens, &ref_tokens, 2)));
        let lcs_f1 = isolate("LCS F1", Ok(rouge_l(&gen_tokens, &ref_tokens)));
        let semantic_similarity = isolate(
            "semantic similarity",
            self.semantic_similarity(&generated, &reference).await,
        )
        .flatten();

        let overall = weighted_overall(&[
            (ngram_overlap, NGRAM_WEIGHT),
            (lcs_f1, LCS_WEIGHT),
            (semantic_similarity, SEMANTIC_WEIGHT),
        ]);

        EvaluationMetrics {
            ngram_overlap: ngram_overlap.map(round4),
            unigram_f1: unigram_f1.map(round4),
            bigram_f1: bigram_f1.map(round4),
            lcs_f1: lcs_f1.map(round4),
            semantic_similarity: semantic_similarity.map(round4),
            overall: overall.map(round4),
        }
    }

    /// `Ok(None)` when no embedder is configured or either text is empty
    async fn semantic_similarity(&self, generated: &str, reference: &str) -> Result<Option<f64>> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        if generated.is_empty() || reference.is_empty() {
            return Ok(None);
        }

        let vectors = embedder
            .embed(&[generated.to_string(), reference.to_string()])
            .await?;
        match vectors.as_slice() {
            [a, b] => Ok(Some(cosine_similarity(a, b) as f64)),
            _ => Err(Error::provider(
                embedder.provider_name(),
                format!("expected 2 embeddings, got {}", vectors.len()),
            )),
        }
    }
}

/// Keep a finite metric value; log and drop failures
fn isolate<T: IsFinite>(metric: &str, value: Result<T>) -> Option<T> {
    match value {
        Ok(v) if v.is_finite_value() => Some(v),
        Ok(_) => {
            tracing::warn!("{} produced a non-finite value, omitting it", metric);
            None
        }
        Err(e) => {
            tracing::warn!("{} unavailable: {}", metric, e);
            None
        }
    }
}

trait IsFinite {
    fn is_finite_value(&self) -> bool;
}

impl IsFinite for f64 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl IsFinite for Option<f64> {
    fn is_finite_value(&self) -> bool {
        self.map_or(true, |v| v.is_finite())
    }
}

/// Weighted mean renormalised over present values; `None` if nothing is present
fn weighted_overall(parts: &[(Option<f64>, f64)]) -> Option<f64> {
    let (sum, weight) = parts
        .iter()
        .filter_map(|(value, weight)| value.map(|v| (v * weight, *weight)))
        .fold((0.0, 0.0), |(s, w), (vs, vw)| (s + vs, w + vw));
    (weight > 0.0).then(|| sum / weight)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{EmbeddingProvider, HashingEmbedder};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::provider("down", "connection refused"))
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_lexical_only_renormalises_overall() {
        let metrics = Evaluator::lexical()
            .evaluate("Revenue grew 10% in 2023.", "revenue grew 10% in 2023")
            .await;

        assert_eq!(metrics.semantic_similarity, None);
        assert_eq!(metrics.lcs_f1, Some(1.0));
        assert_eq!(metrics.ngram_overlap, Some(1.0));
        // Only n-gram and LCS present, each weighted 0.5 after renormalising
        assert_eq!(metrics.overall, Some(1.0));
    }

    #[tokio::test]
    async fn test_semantic_similarity_included_when_embedder_present() {
        let evaluator = Evaluator::with_embedder(Embedder::new(Arc::new(HashingEmbedder::new(256)), 16));
        let metrics = evaluator
            .evaluate("Net income was $5M", "net income was $5m")
            .await;

        assert_eq!(metrics.semantic_similarity, Some(1.0));
        assert_eq!(metrics.overall, Some(1.0));
    }

    #[tokio::test]
    async fn test_provider_failure_only_drops_semantic() {
        let evaluator = Evaluator::with_embedder(Embedder::new(Arc::new(DownProvider), 16));
        let metrics = evaluator.evaluate("alpha beta gamma", "alpha beta delta").await;

        assert_eq!(metrics.semantic_similarity, None);
        assert!(metrics.unigram_f1.is_some());
        let expected = round4(
            (metrics.ngram_overlap.unwrap() * 0.25 + metrics.lcs_f1.unwrap() * 0.25) / 0.5,
        );
        assert!((metrics.overall.unwrap() - expected).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_evaluation_is_deterministic() {
        let evaluator = Evaluator::with_embedder(Embedder::new(Arc::new(HashingEmbedder::new(64)), 16));
        let a = evaluator.evaluate("The company grew fast", "Company growth was fast").await;
        let b = evaluator.evaluate("The company grew fast", "Company growth was fast").await;
        assert_eq!(a, b);
    }

    #[test]
    fn test_weighted_overall() {
        assert_eq!(weighted_overall(&[(None, 0.25), (None, 0.5)]), None);
        assert_eq!(weighted_overall(&[(Some(0.4), 0.25), (None, 0.5)]), Some(0.4));
        let v = weighted_overall(&[(Some(0.0), 0.25), (Some(0.0), 0.25), (Some(1.0), 0.5)]).unwrap();
        assert!((v - 0.5).abs() < 1e-12);
    }
}
