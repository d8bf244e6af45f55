//! Namespaced vector indexes and top-k retrieval

mod memory;
mod namespace;
mod retriever;
mod sqlite;

pub use memory::InMemoryVectorIndex;
pub use namespace::Namespace;
pub use retriever::{RankedContext, Retriever};
pub use sqlite::SqliteVectorIndex;

use crate::providers::{VectorMatch, VectorRecord};

/// Cosine similarity clamped to [0, 1]; 0 for mismatched dimensions or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        return 0.0;
    }
    let cos = dot / (mag_a * mag_b);
    if cos.is_finite() {
        cos.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Score every record against `query` and keep the best `k`, ties broken by vector id
pub(crate) fn rank_matches<I>(records: I, query: &[f32], k: usize) -> Vec<VectorMatch>
where
    I: IntoIterator<Item = VectorRecord>,
{
    let mut matches: Vec<VectorMatch> = records
        .into_iter()
        .map(|r| VectorMatch {
            score: cosine_similarity(query, &r.vector),
            vector_id: r.vector_id,
            text: r.text,
            metadata: r.metadata,
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.vector_id.cmp(&b.vector_id))
    });
    matches.truncate(k);
    matches
}
