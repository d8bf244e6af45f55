//! Vector index trait for namespace-scoped nearest-neighbour search

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::retrieval::Namespace;
use crate::types::Chunk;

/// Metadata stored alongside every vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub page_number: Option<u32>,
}

/// An entry to upsert
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Caller-supplied stable id; re-adding the same id replaces the entry
    pub vector_id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: VectorMetadata,
}

impl VectorRecord {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            vector_id: chunk.vector_id.clone(),
            vector,
            text: chunk.text.clone(),
            metadata: VectorMetadata {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                chunk_index: chunk.chunk_index,
                page_number: chunk.page_number,
            },
        }
    }
}

/// A query hit
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub vector_id: String,
    /// Cosine similarity mapped to [0, 1]
    pub score: f32,
    pub text: String,
    pub metadata: VectorMetadata,
}

/// Trait for namespace-scoped vector storage
///
/// Implementations:
/// - `InMemoryVectorIndex`: concurrent in-process map
/// - `SqliteVectorIndex`: persistent, brute-force scan
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert records by `vector_id`
    async fn add(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> Result<()>;

    /// Up to `k` nearest entries, best first. An absent namespace yields no hits.
    async fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>>;

    /// Remove entries by id, returning how many existed
    async fn delete(&self, namespace: &Namespace, vector_ids: &[String]) -> Result<usize>;

    /// Drop every entry of the namespace, returning how many existed
    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize>;

    async fn count(&self, namespace: &Namespace) -> Result<usize>;

    /// Index name for logging
    fn name(&self) -> &str;
}
