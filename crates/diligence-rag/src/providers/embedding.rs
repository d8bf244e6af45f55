//! Embedding provider trait and the batching embedder built on it

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiClient`: OpenAI-compatible `/embeddings` endpoint
/// - `HashingEmbedder`: offline feature hashing
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one provider-sized batch; must return one vector per input, in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Splits arbitrary input into provider-sized batches.
///
/// Batches run concurrently; output[i] always corresponds to input[i].
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed all texts. Not retried here; see `RetryPolicy`.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches = texts.chunks(self.batch_size).enumerate().map(|(i, batch)| {
            let provider = Arc::clone(&self.provider);
            async move {
                let vectors = provider.embed_batch(batch).await?;
                if vectors.len() != batch.len() {
                    return Err(Error::provider(
                        provider.name(),
                        format!(
                            "batch {} returned {} embeddings for {} inputs",
                            i,
                            vectors.len(),
                            batch.len()
                        ),
                    ));
                }
                tracing::debug!("Embedded batch {} ({} texts) via {}", i, batch.len(), provider.name());
                Ok(vectors)
            }
        });

        let results = try_join_all(batches).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Embed a single text
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::provider(self.provider.name(), "empty embedding response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Encodes each text's numeric value as a 1-d vector and records batch sizes
    struct CountingProvider {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.lock().push(texts.len());
            Ok(texts
                .iter()
                .map(|t| vec![t.parse::<f32>().unwrap_or(-1.0)])
                .collect())
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct ShortProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0]; texts.len().saturating_sub(1)])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_batching_preserves_order() {
        let provider = Arc::new(CountingProvider {
            batches: Mutex::new(Vec::new()),
        });
        let embedder = Embedder::new(provider.clone(), 3);
        let texts: Vec<String> = (0..10).map(|i| i.to_string()).collect();

        let vectors = embedder.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 10);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], i as f32);
        }
        let mut sizes = provider.batches.lock().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 3, 3, 3]);
    }

    #[tokio::test]
    async fn test_empty_input_skips_provider() {
        let provider = Arc::new(CountingProvider {
            batches: Mutex::new(Vec::new()),
        });
        let embedder = Embedder::new(provider.clone(), 3);

        assert!(embedder.embed(&[]).await.unwrap().is_empty());
        assert!(provider.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_count_mismatch_is_provider_error() {
        let embedder = Embedder::new(Arc::new(ShortProvider), 10);
        let err = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
