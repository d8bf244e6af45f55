//! diligence-rag: grounded, citation-backed answers to questionnaire questions
//!
//! Uploaded documents are parsed, chunked, embedded and indexed per
//! tenant/project. Questions are answered from the top-ranked chunks by a
//! language model, with citations derived from the labels the model used,
//! a composite confidence score, and optional offline evaluation against a
//! reference answer.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod scoring;
pub mod service;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use evaluation::{EvaluationMetrics, EvaluationOutcome};
pub use processing::{JobProgress, JobStatus, JobSummary};
pub use service::RagService;
pub use types::{Answer, Chunk, Citation, ConfidenceScores, Document, Question};
