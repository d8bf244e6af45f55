//! Background jobs with progress tracking

mod answering;
mod ingestion;
mod job_queue;
mod pipeline;
mod worker;

pub use answering::AnsweringOrchestrator;
pub use ingestion::IngestionOrchestrator;
pub use job_queue::{
    DocumentOutcome, Job, JobKind, JobProgress, JobQueue, JobRequest, JobStatus, JobStatusSink,
    JobSummary, JobTracker,
};
pub use pipeline::Pipeline;
pub use worker::ProcessingWorker;
