//! Record storage for documents, chunks, questions and answers
//!
//! The pipeline only talks to [`RecordStore`]; `SqliteRecordStore` is the
//! bundled implementation.

mod database;

use uuid::Uuid;

use crate::error::Result;
use crate::types::{Answer, Chunk, Document, ProcessingState, Question, QuestionStatus};

pub use database::SqliteRecordStore;

/// Relational store consumed by the orchestrators
///
/// Calls are synchronous and expected to be short; implementations must be
/// safe to share between jobs.
pub trait RecordStore: Send + Sync {
    fn create_document(&self, document: &Document) -> Result<()>;

    fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Document registered for a storage path within one project
    fn find_document_by_path(
        &self,
        tenant_id: &str,
        project_id: &str,
        storage_path: &str,
    ) -> Result<Option<Document>>;

    fn list_documents(&self, tenant_id: &str, project_id: &str) -> Result<Vec<Document>>;

    /// Advance a document's processing state. `chunk_count` and
    /// `error_message` replace the stored values.
    fn update_document_state(
        &self,
        id: Uuid,
        state: ProcessingState,
        chunk_count: u32,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Delete a document and its chunks. Returns false if it did not exist.
    fn delete_document(&self, id: Uuid) -> Result<bool>;

    /// Insert chunks atomically
    fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Chunks of a document ordered by `chunk_index`
    fn list_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    fn delete_chunks(&self, document_id: Uuid) -> Result<usize>;

    fn create_question(&self, question: &Question) -> Result<()>;

    fn get_question(&self, id: Uuid) -> Result<Option<Question>>;

    /// Question with exactly this text within one project
    fn find_question(&self, tenant_id: &str, project_id: &str, text: &str) -> Result<Option<Question>>;

    fn update_question_status(&self, id: Uuid, status: QuestionStatus) -> Result<()>;

    /// Insert an answer together with its citations
    fn insert_answer(&self, answer: &Answer) -> Result<()>;

    fn get_answer(&self, id: Uuid) -> Result<Option<Answer>>;

    /// Most recent answer for a question
    fn latest_answer(&self, question_id: Uuid) -> Result<Option<Answer>>;
}
