//! Ingestion jobs: parse, embed and index a batch of documents
//!
//! Documents are processed one after another. A parse failure marks only
//! that document failed. Provider, index and store failures mark the current
//! document failed and then abort the job, as does a missing credential.

use std::sync::Arc;

use uuid::Uuid;

use super::job_queue::{DocumentOutcome, JobStatusSink, JobSummary};
use super::pipeline::Pipeline;
use crate::error::{Error, Result};
use crate::providers::{Embedder, VectorRecord};
use crate::retrieval::Namespace;
use crate::types::{Chunk, Document, ProcessingState};

pub const STAGE_PARSING: &str = "parsing";
pub const STAGE_EMBEDDING: &str = "embedding";
pub const STAGE_INDEXING: &str = "indexing";

/// Runs ingestion jobs
#[derive(Clone)]
pub struct IngestionOrchestrator {
    pipeline: Pipeline,
    sink: Arc<dyn JobStatusSink>,
}

/// Per-job state threaded through document processing
struct IngestContext<'a> {
    job_id: Uuid,
    embedder: &'a Embedder,
    namespace: &'a Namespace,
    fraction: f32,
}

impl IngestionOrchestrator {
    pub fn new(pipeline: Pipeline, sink: Arc<dyn JobStatusSink>) -> Self {
        Self { pipeline, sink }
    }

    /// Ingest every path that resolves to a registered document
    pub async fn run(
        &self,
        job_id: Uuid,
        tenant_id: &str,
        project_id: &str,
        file_paths: &[String],
    ) -> Result<JobSummary> {
        let embedder = self.pipeline.embedder(tenant_id).await?;
        let namespace = Namespace::for_project(tenant_id, project_id);
        let total = file_paths.len();

        tracing::info!(
            "Ingesting {} file(s) into {} with {}",
            total,
            namespace,
            embedder.provider_name()
        );

        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut chunks_indexed = 0;

        for (i, path) in file_paths.iter().enumerate() {
            let fraction = i as f32 / total as f32;
            self.sink
                .update_progress(job_id, fraction, STAGE_PARSING, Some(path.as_str()));

            let Some(document) = self
                .pipeline
                .store
                .find_document_by_path(tenant_id, project_id, path)?
            else {
                tracing::warn!("No document registered for {}, skipping", path);
                skipped += 1;
                continue;
            };

            let ctx = IngestContext {
                job_id,
                embedder: &embedder,
                namespace: &namespace,
                fraction,
            };

            match self.ingest_document(&ctx, &document).await? {
                (DocumentOutcome::Completed, count) => {
                    completed += 1;
                    chunks_indexed += count;
                }
                (DocumentOutcome::Failed, _) => failed += 1,
                (DocumentOutcome::Skipped, _) => skipped += 1,
            }
        }

        tracing::info!(
            "Ingestion job {} finished: {} completed, {} failed, {} skipped",
            job_id,
            completed,
            failed,
            skipped
        );

        Ok(JobSummary::Ingestion {
            documents_completed: completed,
            documents_failed: failed,
            documents_skipped: skipped,
            chunks_indexed,
        })
    }

    /// Process one document and record its terminal state.
    ///
    /// Returns `Err` only for failures that should abort the whole job.
    async fn ingest_document(
        &self,
        ctx: &IngestContext<'_>,
        document: &Document,
    ) -> Result<(DocumentOutcome, usize)> {
        let store = &self.pipeline.store;
        let mut written = Vec::new();

        let result = match store.update_document_state(document.id, ProcessingState::Processing, 0, None) {
            Ok(()) => self.index_document(ctx, document, &mut written).await,
            Err(e) => Err(e),
        };
        let result = result.and_then(|count| {
            store.update_document_state(document.id, ProcessingState::Completed, count as u32, None)?;
            Ok(count)
        });

        match result {
            Ok(count) => {
                tracing::info!("Indexed {} ({} chunks)", document.filename, count);
                Ok((DocumentOutcome::Completed, count))
            }
            Err(e) => {
                self.fail_document(ctx, document, &written, &e).await;
                if e.is_document_level() {
                    Ok((DocumentOutcome::Failed, 0))
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn index_document(
        &self,
        ctx: &IngestContext<'_>,
        document: &Document,
        written: &mut Vec<String>,
    ) -> Result<usize> {
        let store = &self.pipeline.store;
        let index = &self.pipeline.index;

        self.remove_previous_chunks(ctx, document).await?;

        let data = tokio::fs::read(&document.storage_path)
            .await
            .map_err(|e| Error::file_parse(&document.filename, format!("cannot read {}: {}", document.storage_path, e)))?;

        let chunker = self.pipeline.chunker.clone();
        let filename = document.filename.clone();
        let format = document.format;
        let drafts = tokio::task::spawn_blocking(move || chunker.parse(&filename, &data, format))
            .await
            .map_err(|e| Error::file_parse(&document.filename, format!("parser aborted: {}", e)))??;

        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| Chunk::from_draft(document, i as u32, draft))
            .collect();

        self.sink
            .update_progress(ctx.job_id, ctx.fraction, STAGE_EMBEDDING, Some(document.storage_path.as_str()));
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = ctx.embedder.embed(&texts).await?;

        self.sink
            .update_progress(ctx.job_id, ctx.fraction, STAGE_INDEXING, Some(document.storage_path.as_str()));
        store.insert_chunks(&chunks)?;
        written.extend(chunks.iter().map(|c| c.vector_id.clone()));

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
            .collect();
        index.add(ctx.namespace, records).await?;

        Ok(chunks.len())
    }

    /// Drop chunks and vectors left by an earlier ingestion of this document
    async fn remove_previous_chunks(&self, ctx: &IngestContext<'_>, document: &Document) -> Result<()> {
        let previous = self.pipeline.store.list_chunks(document.id)?;
        if previous.is_empty() {
            return Ok(());
        }

        let vector_ids: Vec<String> = previous.into_iter().map(|c| c.vector_id).collect();
        let removed = self.pipeline.index.delete(ctx.namespace, &vector_ids).await?;
        self.pipeline.store.delete_chunks(document.id)?;
        tracing::info!(
            "Re-indexing {}: removed {} previous chunks ({} vectors)",
            document.filename,
            vector_ids.len(),
            removed
        );
        Ok(())
    }

    /// Best-effort cleanup of partial output, then mark the document failed
    async fn fail_document(&self, ctx: &IngestContext<'_>, document: &Document, written: &[String], error: &Error) {
        tracing::error!("Failed to ingest {}: {}", document.filename, error);

        if !written.is_empty() {
            if let Err(e) = self.pipeline.index.delete(ctx.namespace, written).await {
                tracing::warn!("Cleanup of vectors for {} failed: {}", document.filename, e);
            }
            if let Err(e) = self.pipeline.store.delete_chunks(document.id) {
                tracing::warn!("Cleanup of chunks for {} failed: {}", document.filename, e);
            }
        }

        let message = error.to_string();
        if let Err(e) = self
            .pipeline
            .store
            .update_document_state(document.id, ProcessingState::Failed, 0, Some(&message))
        {
            tracing::error!("Could not mark {} failed: {}", document.filename, e);
        }
    }
}
