//! In-memory vector index with brute-force cosine search

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{rank_matches, Namespace};
use crate::error::Result;
use crate::providers::{VectorIndex, VectorMatch, VectorRecord};

/// Concurrent map of namespaces. Different namespaces never contend on the same lock.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    namespaces: DashMap<Namespace, HashMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> Result<()> {
        let mut entries = self.namespaces.entry(namespace.clone()).or_default();
        for record in records {
            entries.insert(record.vector_id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        let Some(entries) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(rank_matches(entries.values().cloned(), vector, k))
    }

    async fn delete(&self, namespace: &Namespace, vector_ids: &[String]) -> Result<usize> {
        let Some(mut entries) = self.namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        Ok(vector_ids
            .iter()
            .filter(|id| entries.remove(id.as_str()).is_some())
            .count())
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize> {
        Ok(self
            .namespaces
            .remove(namespace)
            .map(|(_, entries)| entries.len())
            .unwrap_or(0))
    }

    async fn count(&self, namespace: &Namespace) -> Result<usize> {
        Ok(self.namespaces.get(namespace).map(|e| e.len()).unwrap_or(0))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
