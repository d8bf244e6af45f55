//! Top-k retrieval: embed the query, search the project namespace

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Namespace;
use crate::error::Result;
use crate::providers::{Embedder, VectorIndex};

/// A retrieved chunk handed to generation and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedContext {
    /// 1-based rank; also the `[i]` label used in the prompt
    pub rank: u32,
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub vector_id: String,
    pub text: String,
    pub page_number: Option<u32>,
    pub chunk_index: u32,
    /// Cosine similarity in [0, 1]
    pub score: f32,
}

/// Composes the embedder and the vector index
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Embedder, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k: top_k.max(1),
        }
    }

    /// Embed the query and return the best matches in rank order
    pub async fn retrieve(&self, namespace: &Namespace, query: &str) -> Result<Vec<RankedContext>> {
        let vector = self.embedder.embed_one(query).await?;
        self.retrieve_by_vector(namespace, &vector).await
    }

    /// Search with an already embedded query
    pub async fn retrieve_by_vector(&self, namespace: &Namespace, vector: &[f32]) -> Result<Vec<RankedContext>> {
        let matches = self.index.query(namespace, vector, self.top_k).await?;

        tracing::debug!(
            "Retrieved {} context(s) from {} namespace {}",
            matches.len(),
            self.index.name(),
            namespace
        );

        Ok(matches
            .into_iter()
            .enumerate()
            .map(|(i, m)| RankedContext {
                rank: i as u32 + 1,
                chunk_id: m.metadata.chunk_id,
                document_id: m.metadata.document_id,
                vector_id: m.vector_id,
                text: m.text,
                page_number: m.metadata.page_number,
                chunk_index: m.metadata.chunk_index,
                score: m.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{HashingEmbedder, VectorMetadata, VectorRecord};
    use crate::retrieval::InMemoryVectorIndex;

    #[tokio::test]
    async fn test_ranks_are_one_based_and_bounded_by_k() {
        let hashing = Arc::new(HashingEmbedder::new(128));
        let index = Arc::new(InMemoryVectorIndex::new());
        let ns = Namespace::for_project("t", "p");

        let texts = ["revenue grew", "revenue fell", "office in berlin"];
        let records = texts
            .iter()
            .enumerate()
            .map(|(i, t)| VectorRecord {
                vector_id: format!("v{}", i),
                vector: hashing.embed_text(t),
                text: t.to_string(),
                metadata: VectorMetadata {
                    chunk_id: Uuid::new_v4(),
                    document_id: Uuid::new_v4(),
                    chunk_index: i as u32,
                    page_number: None,
                },
            })
            .collect();
        index.add(&ns, records).await.unwrap();

        let retriever = Retriever::new(Embedder::new(hashing, 16), index, 2);
        let contexts = retriever.retrieve(&ns, "revenue grew").await.unwrap();

        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].rank, 1);
        assert_eq!(contexts[1].rank, 2);
        assert_eq!(contexts[0].text, "revenue grew");
        assert!(contexts[0].score >= contexts[1].score);
    }

    #[tokio::test]
    async fn test_empty_namespace_returns_no_contexts() {
        let retriever = Retriever::new(
            Embedder::new(Arc::new(HashingEmbedder::new(16)), 16),
            Arc::new(InMemoryVectorIndex::new()),
            5,
        );
        let contexts = retriever
            .retrieve(&Namespace::for_project("t", "empty"), "anything")
            .await
            .unwrap();
        assert!(contexts.is_empty());
    }
}
