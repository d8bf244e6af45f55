//! Job submission and progress tracking
//!
//! Submission is fire-and-forget: `JobQueue::submit` registers the job with
//! the status sink and hands it to the worker channel, returning the handle
//! immediately.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Job lifecycle: `queued -> running -> completed | failed`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Kind of background job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Ingestion,
    Answering,
}

/// Work carried by a job
#[derive(Debug, Clone)]
pub enum JobRequest {
    Ingestion {
        tenant_id: String,
        project_id: String,
        file_paths: Vec<String>,
    },
    Answering {
        tenant_id: String,
        project_id: String,
        question: String,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Ingestion { .. } => JobKind::Ingestion,
            Self::Answering { .. } => JobKind::Answering,
        }
    }

    fn scope(&self) -> (&str, &str) {
        match self {
            Self::Ingestion {
                tenant_id,
                project_id,
                ..
            }
            | Self::Answering {
                tenant_id,
                project_id,
                ..
            } => (tenant_id, project_id),
        }
    }
}

/// A queued job
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub request: JobRequest,
}

/// Per-document ingestion result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcome {
    Completed,
    Failed,
    Skipped,
}

/// Result attached to a completed job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSummary {
    Ingestion {
        documents_completed: usize,
        documents_failed: usize,
        documents_skipped: usize,
        chunks_indexed: usize,
    },
    Answering {
        answer_id: Uuid,
        question_id: Uuid,
        overall_confidence: f32,
    },
}

/// Status record returned for a job handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub tenant_id: String,
    pub project_id: String,
    pub status: JobStatus,
    /// Fraction of the job done, in [0, 1]
    pub fraction: f32,
    pub stage: Option<String>,
    pub current_item: Option<String>,
    /// Failure message, verbatim
    pub message: Option<String>,
    pub summary: Option<JobSummary>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl JobProgress {
    pub fn new(job_id: Uuid, kind: JobKind, tenant_id: &str, project_id: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            job_id,
            kind,
            tenant_id: tenant_id.to_string(),
            project_id: project_id.to_string(),
            status: JobStatus::Queued,
            fraction: 0.0,
            stage: None,
            current_item: None,
            message: None,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Receives incremental job updates and answers status queries
pub trait JobStatusSink: Send + Sync {
    fn register(&self, job_id: Uuid, kind: JobKind, tenant_id: &str, project_id: &str);

    fn mark_running(&self, job_id: Uuid);

    /// Record progress; `fraction` is clamped to [0, 1]
    fn update_progress(&self, job_id: Uuid, fraction: f32, stage: &str, current_item: Option<&str>);

    fn complete(&self, job_id: Uuid, summary: JobSummary);

    fn fail(&self, job_id: Uuid, message: &str);

    fn get(&self, job_id: Uuid) -> Option<JobProgress>;

    /// All known jobs, newest first
    fn list(&self) -> Vec<JobProgress>;
}

/// In-memory job status sink
#[derive(Default)]
pub struct JobTracker {
    jobs: DashMap<Uuid, JobProgress>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, job_id: Uuid, f: impl FnOnce(&mut JobProgress)) {
        match self.jobs.get_mut(&job_id) {
            Some(mut progress) => {
                // Terminal states are final
                if progress.status.is_terminal() {
                    return;
                }
                f(&mut progress);
                progress.updated_at = chrono::Utc::now();
            }
            None => tracing::warn!("Update for unknown job {}", job_id),
        }
    }
}

impl JobStatusSink for JobTracker {
    fn register(&self, job_id: Uuid, kind: JobKind, tenant_id: &str, project_id: &str) {
        self.jobs
            .insert(job_id, JobProgress::new(job_id, kind, tenant_id, project_id));
    }

    fn mark_running(&self, job_id: Uuid) {
        self.update(job_id, |p| p.status = JobStatus::Running);
    }

    fn update_progress(&self, job_id: Uuid, fraction: f32, stage: &str, current_item: Option<&str>) {
        self.update(job_id, |p| {
            p.fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { p.fraction };
            p.stage = Some(stage.to_string());
            p.current_item = current_item.map(str::to_string);
        });
    }

    fn complete(&self, job_id: Uuid, summary: JobSummary) {
        self.update(job_id, |p| {
            p.status = JobStatus::Completed;
            p.fraction = 1.0;
            p.current_item = None;
            p.summary = Some(summary);
        });
    }

    fn fail(&self, job_id: Uuid, message: &str) {
        self.update(job_id, |p| {
            p.status = JobStatus::Failed;
            p.message = Some(message.to_string());
        });
    }

    fn get(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs.get(&job_id).map(|p| p.clone())
    }

    fn list(&self) -> Vec<JobProgress> {
        let mut jobs: Vec<JobProgress> = self.jobs.iter().map(|p| p.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}

/// Hands jobs to the worker
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    sink: Arc<dyn JobStatusSink>,
}

impl JobQueue {
    /// Create a queue and the receiver the worker drains
    pub fn new(sink: Arc<dyn JobStatusSink>, capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender, sink }, receiver)
    }

    /// Register and enqueue a job, returning its handle
    pub async fn submit(&self, request: JobRequest) -> Result<Uuid> {
        let job_id = Uuid::new_v4();
        let (tenant_id, project_id) = request.scope();
        self.sink.register(job_id, request.kind(), tenant_id, project_id);

        tracing::info!("Queued {:?} job {} for {}/{}", request.kind(), job_id, tenant_id, project_id);

        if self.sender.send(Job { id: job_id, request }).await.is_err() {
            let message = "Job worker is not running";
            self.sink.fail(job_id, message);
            return Err(Error::internal(message));
        }
        Ok(job_id)
    }

    pub fn sink(&self) -> &Arc<dyn JobStatusSink> {
        &self.sink
    }
}
