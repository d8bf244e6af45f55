//! Background worker draining the job channel

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use super::answering::AnsweringOrchestrator;
use super::ingestion::IngestionOrchestrator;
use super::job_queue::{Job, JobRequest, JobStatusSink};
use super::pipeline::Pipeline;

/// Runs each received job in its own task, bounded by a semaphore
#[derive(Clone)]
pub struct ProcessingWorker {
    ingestion: IngestionOrchestrator,
    answering: AnsweringOrchestrator,
    sink: Arc<dyn JobStatusSink>,
    semaphore: Arc<Semaphore>,
}

impl ProcessingWorker {
    pub fn new(pipeline: Pipeline, sink: Arc<dyn JobStatusSink>) -> Self {
        let concurrent_jobs = pipeline.config.processing.concurrent_jobs();
        tracing::info!("Worker configured: {} concurrent jobs", concurrent_jobs);

        Self {
            ingestion: IngestionOrchestrator::new(pipeline.clone(), Arc::clone(&sink)),
            answering: AnsweringOrchestrator::new(pipeline, Arc::clone(&sink)),
            sink,
            semaphore: Arc::new(Semaphore::new(concurrent_jobs)),
        }
    }

    /// Process jobs until every sender is dropped
    pub async fn run(self, mut receiver: mpsc::Receiver<Job>) {
        tracing::info!("Processing worker started");

        while let Some(job) = receiver.recv().await {
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let worker = self.clone();
            tokio::spawn(async move {
                worker.supervise(job).await;
                drop(permit);
            });
        }

        tracing::info!("Processing worker stopped");
    }

    /// Run a job in its own task, failing it if that task panics
    async fn supervise(self, job: Job) {
        let job_id = job.id;
        let sink = Arc::clone(&self.sink);
        let handle = tokio::spawn(async move { self.execute(job).await });

        if let Err(e) = handle.await {
            tracing::error!("Job {} aborted: {}", job_id, e);
            sink.fail(job_id, &format!("Job aborted: {}", e));
        }
    }

    /// Run one job to a terminal state
    pub async fn execute(&self, job: Job) {
        let job_id = job.id;
        self.sink.mark_running(job_id);

        let result = match &job.request {
            JobRequest::Ingestion {
                tenant_id,
                project_id,
                file_paths,
            } => {
                self.ingestion
                    .run(job_id, tenant_id, project_id, file_paths)
                    .await
            }
            JobRequest::Answering {
                tenant_id,
                project_id,
                question,
            } => {
                self.answering
                    .run(job_id, tenant_id, project_id, question)
                    .await
            }
        };

        match result {
            Ok(summary) => {
                tracing::info!("Job {} completed", job_id);
                self.sink.complete(job_id, summary);
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", job_id, e);
                self.sink.fail(job_id, &e.to_string());
            }
        }
    }
}
