//! Document and chunk types with provenance for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported document formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// PDF document (page-oriented)
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
}

impl DocumentFormat {
    /// Detect format from a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect format from a filename or path
    pub fn from_filename(filename: &str) -> Option<Self> {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether extracted text is split per page
    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Markdown => "markdown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Document processing state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// An uploaded document, created on upload and advanced during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: String,
    pub project_id: String,
    /// Original filename as uploaded
    pub filename: String,
    /// Where the raw bytes live
    pub storage_path: String,
    pub format: DocumentFormat,
    pub file_size: u64,
    /// SHA-256 of the raw file, hex encoded
    pub file_hash: String,
    pub state: ProcessingState,
    pub chunk_count: u32,
    /// Failure message when `state` is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Document {
    /// Create a pending document record for an uploaded file
    pub fn new(
        tenant_id: impl Into<String>,
        project_id: impl Into<String>,
        filename: impl Into<String>,
        storage_path: impl Into<String>,
        format: DocumentFormat,
        file_size: u64,
        file_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            project_id: project_id.into(),
            filename: filename.into(),
            storage_path: storage_path.into(),
            format,
            file_size,
            file_hash: file_hash.into(),
            state: ProcessingState::Pending,
            chunk_count: 0,
            error_message: None,
            uploaded_at: chrono::Utc::now(),
            processed_at: None,
        }
    }
}

/// A chunk produced by the chunker, before it is bound to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDraft {
    pub text: String,
    /// 1-indexed page for page-oriented formats
    pub page_number: Option<u32>,
    pub char_start: usize,
    pub char_end: usize,
    pub content_hash: String,
    pub token_count: u32,
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
    /// Ordinal within the document (dense, 0-based)
    pub chunk_index: u32,
    pub text: String,
    pub page_number: Option<u32>,
    pub char_start: usize,
    pub char_end: usize,
    pub content_hash: String,
    pub token_count: u32,
    /// Id of the entry in the vector index (1:1 with the chunk)
    pub vector_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Chunk {
    /// Bind a chunk draft to its parent document
    pub fn from_draft(document: &Document, chunk_index: u32, draft: ChunkDraft) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            document_id: document.id,
            tenant_id: document.tenant_id.clone(),
            chunk_index,
            text: draft.text,
            page_number: draft.page_number,
            char_start: draft.char_start,
            char_end: draft.char_end,
            content_hash: draft.content_hash,
            token_count: draft.token_count,
            vector_id: id.to_string(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_filename("Report.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_filename("notes.md"), Some(DocumentFormat::Markdown));
        assert_eq!(DocumentFormat::from_filename("memo.docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_filename("sheet.xlsx"), None);
        assert_eq!(DocumentFormat::from_filename("noext"), None);
    }

    #[test]
    fn test_chunk_vector_id_matches_chunk_id() {
        let doc = Document::new("t", "p", "a.txt", "/tmp/a.txt", DocumentFormat::Txt, 3, "abc");
        let draft = ChunkDraft {
            text: "hello".into(),
            page_number: None,
            char_start: 0,
            char_end: 5,
            content_hash: "h".into(),
            token_count: 1,
        };
        let chunk = Chunk::from_draft(&doc, 0, draft);
        assert_eq!(chunk.vector_id, chunk.id.to_string());
        assert_eq!(chunk.tenant_id, "t");
        assert_eq!(chunk.document_id, doc.id);
    }
}
