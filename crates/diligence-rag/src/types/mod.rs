//! Core types for the answering pipeline

pub mod document;
pub mod question;
pub mod response;

pub use document::{Chunk, ChunkDraft, Document, DocumentFormat, ProcessingState};
pub use question::{Question, QuestionStatus};
pub use response::{Answer, Citation, ConfidenceScores};
