//! Error types for the answering pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Document-level variants (`FileParse`, `UnsupportedFormat`, `NoContent`) are
/// caught by the ingestion orchestrator and recorded against one document.
/// `Configuration` and `Provider` abort the job that raised them.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error, including a missing provider credential
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External model or index transport/auth failure
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Parsing succeeded but produced no chunks
    #[error("No text content could be extracted from '{0}'")]
    NoContent(String),

    /// A grading sub-call returned something that could not be parsed.
    /// Never surfaced past the confidence scorer.
    #[error("Grading degraded: {0}")]
    GradingDegraded(String),

    /// Record store or vector index storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a not-found error
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error belongs to a single document rather than the whole job
    pub fn is_document_level(&self) -> bool {
        matches!(
            self,
            Self::FileParse { .. } | Self::UnsupportedFormat(_) | Self::NoContent(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}
