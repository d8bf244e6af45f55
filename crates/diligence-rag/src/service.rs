//! Core API: job submission, status queries, evaluation and index maintenance

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::evaluation::{EvaluationOutcome, Evaluator};
use crate::ingestion::{Chunker, PageRecognizer, TesseractRecognizer};
use crate::processing::{
    JobProgress, JobQueue, JobRequest, JobStatusSink, JobTracker, Pipeline, ProcessingWorker,
};
use crate::providers::{ConfiguredProviders, EnvCredentialResolver};
use crate::retrieval::{Namespace, SqliteVectorIndex};
use crate::storage::SqliteRecordStore;
use crate::types::{Document, DocumentFormat};

/// Handle to the answering pipeline; cheap to clone
#[derive(Clone)]
pub struct RagService {
    inner: Arc<RagServiceInner>,
}

struct RagServiceInner {
    pipeline: Pipeline,
    queue: JobQueue,
    sink: Arc<dyn JobStatusSink>,
}

impl RagService {
    /// Start the background worker and return the service.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(pipeline: Pipeline) -> Self {
        Self::start_with_sink(pipeline, Arc::new(JobTracker::new()))
    }

    /// Start with a caller-provided job status sink
    pub fn start_with_sink(pipeline: Pipeline, sink: Arc<dyn JobStatusSink>) -> Self {
        let (queue, receiver) = JobQueue::new(Arc::clone(&sink), pipeline.config.processing.queue_capacity);
        let worker = ProcessingWorker::new(pipeline.clone(), Arc::clone(&sink));
        tokio::spawn(worker.run(receiver));

        Self {
            inner: Arc::new(RagServiceInner { pipeline, queue, sink }),
        }
    }

    /// Build the default stack from configuration: SQLite record store and
    /// vector index, environment credentials, configured model providers and,
    /// when the tools are installed, scanned-page recognition.
    pub fn open(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(SqliteRecordStore::new(&config.storage.database_path)?);
        let index = Arc::new(SqliteVectorIndex::new(&config.storage.vector_index_path)?);
        let providers = Arc::new(ConfiguredProviders::new(config.clone()));

        let mut chunker = Chunker::new(&config.chunking);
        if config.ocr.enabled {
            if TesseractRecognizer::is_available() {
                let recognizer: Arc<dyn PageRecognizer> = Arc::new(TesseractRecognizer::new(&config.ocr));
                chunker = chunker.with_recognizer(recognizer);
            } else {
                tracing::warn!("pdftoppm/tesseract not found, scanned pages will be skipped");
            }
        }

        let pipeline = Pipeline::new(
            config,
            store,
            index,
            Arc::new(EnvCredentialResolver::new()),
            providers,
        )
        .with_chunker(chunker);

        Ok(Self::start(pipeline))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Create the pending document record an upload would create
    pub async fn register_document(&self, tenant_id: &str, project_id: &str, path: &Path) -> Result<Document> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::file_parse(path.display().to_string(), "path has no file name"))?
            .to_string();
        let format = DocumentFormat::from_filename(&filename)
            .ok_or_else(|| Error::UnsupportedFormat(filename.clone()))?;

        let data = tokio::fs::read(path).await?;
        let file_hash = hex::encode(Sha256::digest(&data));

        let document = Document::new(
            tenant_id,
            project_id,
            filename,
            path.to_string_lossy(),
            format,
            data.len() as u64,
            file_hash,
        );
        self.inner.pipeline.store.create_document(&document)?;

        tracing::info!("Registered {} as document {}", document.storage_path, document.id);
        Ok(document)
    }

    /// Queue ingestion of registered documents, returning the job handle
    pub async fn submit_ingestion_job(
        &self,
        tenant_id: &str,
        project_id: &str,
        file_paths: Vec<String>,
    ) -> Result<Uuid> {
        self.inner
            .queue
            .submit(JobRequest::Ingestion {
                tenant_id: tenant_id.to_string(),
                project_id: project_id.to_string(),
                file_paths,
            })
            .await
    }

    /// Queue answering of one question, returning the job handle
    pub async fn submit_answering_job(&self, tenant_id: &str, project_id: &str, question: &str) -> Result<Uuid> {
        self.inner
            .queue
            .submit(JobRequest::Answering {
                tenant_id: tenant_id.to_string(),
                project_id: project_id.to_string(),
                question: question.to_string(),
            })
            .await
    }

    pub fn get_job_status(&self, job_id: Uuid) -> Result<JobProgress> {
        self.inner
            .sink
            .get(job_id)
            .ok_or_else(|| Error::not_found("Job", job_id))
    }

    pub fn list_jobs(&self) -> Vec<JobProgress> {
        self.inner.sink.list()
    }

    /// Compare a stored answer with its question's reference answer
    pub async fn evaluate(&self, answer_id: Uuid) -> Result<EvaluationOutcome> {
        let store = &self.inner.pipeline.store;
        let answer = store
            .get_answer(answer_id)?
            .ok_or_else(|| Error::not_found("Answer", answer_id))?;
        let question = store
            .get_question(answer.question_id)?
            .ok_or_else(|| Error::not_found("Question", answer.question_id))?;

        let Some(reference) = question.reference_answer() else {
            tracing::info!("Question {} has no reference answer", question.id);
            return Ok(EvaluationOutcome::NoGroundTruth);
        };

        let evaluator = match self.inner.pipeline.embedder(&question.tenant_id).await {
            Ok(embedder) => Evaluator::with_embedder(embedder),
            Err(e) => {
                tracing::warn!("Semantic similarity unavailable: {}", e);
                Evaluator::lexical()
            }
        };

        let metrics = evaluator.evaluate(&answer.text, reference).await;
        Ok(EvaluationOutcome::Metrics(metrics))
    }

    /// Delete a document, its chunks and their vectors
    pub async fn delete_document(&self, tenant_id: &str, project_id: &str, document_id: Uuid) -> Result<()> {
        let pipeline = &self.inner.pipeline;
        let document = pipeline
            .store
            .get_document(document_id)?
            .filter(|d| d.tenant_id == tenant_id && d.project_id == project_id)
            .ok_or_else(|| Error::not_found("Document", document_id))?;

        let vector_ids: Vec<String> = pipeline
            .store
            .list_chunks(document.id)?
            .into_iter()
            .map(|c| c.vector_id)
            .collect();
        let namespace = Namespace::for_project(tenant_id, project_id);
        let removed = pipeline.index.delete(&namespace, &vector_ids).await?;
        pipeline.store.delete_document(document.id)?;

        tracing::info!("Deleted document {} ({} vectors)", document.id, removed);
        Ok(())
    }

    /// Drop a project's whole vector namespace, returning the entries removed
    pub async fn delete_project_index(&self, tenant_id: &str, project_id: &str) -> Result<usize> {
        let namespace = Namespace::for_project(tenant_id, project_id);
        let removed = self.inner.pipeline.index.delete_namespace(&namespace).await?;
        tracing::info!("Deleted namespace {} ({} vectors)", namespace, removed);
        Ok(removed)
    }
}
