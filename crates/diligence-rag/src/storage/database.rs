//! SQLite record store
//!
//! One connection behind a mutex; every call takes the lock for its whole
//! duration, multi-row writes run in a transaction.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::RecordStore;
use crate::error::{Error, Result};
use crate::types::{
    Answer, Chunk, Citation, ConfidenceScores, Document, DocumentFormat, ProcessingState, Question,
    QuestionStatus,
};

const DOCUMENT_COLUMNS: &str = "id, tenant_id, project_id, filename, storage_path, format, \
     file_size, file_hash, state, chunk_count, error_message, uploaded_at, processed_at";

const CHUNK_COLUMNS: &str = "id, document_id, tenant_id, chunk_index, text, page_number, \
     char_start, char_end, content_hash, token_count, vector_id, created_at";

const QUESTION_COLUMNS: &str =
    "id, tenant_id, project_id, text, category, number, ground_truth, status, created_at";

const ANSWER_COLUMNS: &str = "id, question_id, question_text, text, ai_generated, \
     overall, retrieval, coverage, faithfulness, relevancy, created_at";

/// SQLite-backed [`RecordStore`]
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open database {}: {}", path.display(), e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate(true)?;
        Ok(store)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate(false)?;
        Ok(store)
    }

    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA temp_store=MEMORY;
                "#,
            )
            .map_err(|e| Error::storage(format!("Failed to set pragmas: {}", e)))?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                format TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_hash TEXT NOT NULL,
                state TEXT NOT NULL,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                uploaded_at TEXT NOT NULL,
                processed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(tenant_id, project_id);
            CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(tenant_id, project_id, storage_path);

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                page_number INTEGER,
                char_start INTEGER NOT NULL,
                char_end INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                vector_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(document_id, chunk_index)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);

            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                text TEXT NOT NULL,
                category TEXT,
                number TEXT,
                ground_truth TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_project ON questions(tenant_id, project_id);

            CREATE TABLE IF NOT EXISTS answers (
                id TEXT PRIMARY KEY,
                question_id TEXT NOT NULL,
                question_text TEXT NOT NULL,
                text TEXT NOT NULL,
                ai_generated INTEGER NOT NULL,
                overall REAL NOT NULL,
                retrieval REAL NOT NULL,
                coverage REAL NOT NULL,
                faithfulness REAL NOT NULL,
                relevancy REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id);

            -- chunk_id is not a foreign key: citations outlive re-indexed chunks
            CREATE TABLE IF NOT EXISTS citations (
                id TEXT PRIMARY KEY,
                answer_id TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                page_number INTEGER,
                excerpt TEXT NOT NULL,
                relevance_score REAL NOT NULL,
                citation_order INTEGER NOT NULL,
                FOREIGN KEY (answer_id) REFERENCES answers(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_citations_answer_id ON citations(answer_id);
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!("Record store migrations complete");
        Ok(())
    }

    fn query_answer(conn: &Connection, sql: &str, key: &str) -> Result<Option<Answer>> {
        let answer = conn
            .query_row(sql, params![key], row_to_answer)
            .optional()
            .map_err(|e| Error::storage(format!("Failed to get answer: {}", e)))?;

        let Some(mut answer) = answer else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, answer_id, chunk_id, document_id, page_number, excerpt, relevance_score, citation_order \
             FROM citations WHERE answer_id = ?1 ORDER BY citation_order ASC",
        )?;
        answer.citations = stmt
            .query_map(params![answer.id.to_string()], row_to_citation)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::storage(format!("Failed to load citations: {}", e)))?;

        Ok(Some(answer))
    }
}

impl RecordStore for SqliteRecordStore {
    fn create_document(&self, document: &Document) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            &format!(
                "INSERT INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                DOCUMENT_COLUMNS
            ),
            params![
                document.id.to_string(),
                document.tenant_id,
                document.project_id,
                document.filename,
                document.storage_path,
                document.format.as_str(),
                document.file_size as i64,
                document.file_hash,
                document.state.as_str(),
                document.chunk_count as i64,
                document.error_message,
                document.uploaded_at.to_rfc3339(),
                document.processed_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to create document: {}", e)))?;

        Ok(())
    }

    fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();

        let document = conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                params![id.to_string()],
                row_to_document,
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to get document: {}", e)))?;

        Ok(document)
    }

    fn find_document_by_path(
        &self,
        tenant_id: &str,
        project_id: &str,
        storage_path: &str,
    ) -> Result<Option<Document>> {
        let conn = self.conn.lock();

        let document = conn
            .query_row(
                &format!(
                    "SELECT {} FROM documents WHERE tenant_id = ?1 AND project_id = ?2 AND storage_path = ?3 \
                     ORDER BY uploaded_at DESC LIMIT 1",
                    DOCUMENT_COLUMNS
                ),
                params![tenant_id, project_id, storage_path],
                row_to_document,
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to find document: {}", e)))?;

        Ok(document)
    }

    fn list_documents(&self, tenant_id: &str, project_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE tenant_id = ?1 AND project_id = ?2 ORDER BY uploaded_at ASC",
            DOCUMENT_COLUMNS
        ))?;

        let documents = stmt
            .query_map(params![tenant_id, project_id], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::storage(format!("Failed to list documents: {}", e)))?;

        Ok(documents)
    }

    fn update_document_state(
        &self,
        id: Uuid,
        state: ProcessingState,
        chunk_count: u32,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();

        let processed_at = state.is_terminal().then(|| Utc::now().to_rfc3339());
        let updated = conn
            .execute(
                "UPDATE documents SET state = ?2, chunk_count = ?3, error_message = ?4, \
                 processed_at = COALESCE(?5, processed_at) WHERE id = ?1",
                params![
                    id.to_string(),
                    state.as_str(),
                    chunk_count as i64,
                    error_message,
                    processed_at,
                ],
            )
            .map_err(|e| Error::storage(format!("Failed to update document: {}", e)))?;

        if updated == 0 {
            return Err(Error::not_found("Document", id));
        }
        Ok(())
    }

    fn delete_document(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![id.to_string()])?;
        let deleted = tx.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;

        tx.commit()
            .map_err(|e| Error::storage(format!("Failed to delete document: {}", e)))?;
        Ok(deleted > 0)
    }

    fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO chunks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                CHUNK_COLUMNS
            ))?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.id.to_string(),
                    chunk.document_id.to_string(),
                    chunk.tenant_id,
                    chunk.chunk_index as i64,
                    chunk.text,
                    chunk.page_number.map(|p| p as i64),
                    chunk.char_start as i64,
                    chunk.char_end as i64,
                    chunk.content_hash,
                    chunk.token_count as i64,
                    chunk.vector_id,
                    chunk.created_at.to_rfc3339(),
                ])
                .map_err(|e| Error::storage(format!("Failed to insert chunk {}: {}", chunk.chunk_index, e)))?;
            }
        }

        tx.commit()
            .map_err(|e| Error::storage(format!("Failed to commit chunks: {}", e)))?;
        Ok(())
    }

    fn list_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE document_id = ?1 ORDER BY chunk_index ASC",
            CHUNK_COLUMNS
        ))?;

        let chunks = stmt
            .query_map(params![document_id.to_string()], row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::storage(format!("Failed to list chunks: {}", e)))?;

        Ok(chunks)
    }

    fn delete_chunks(&self, document_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();

        let count = conn
            .execute(
                "DELETE FROM chunks WHERE document_id = ?1",
                params![document_id.to_string()],
            )
            .map_err(|e| Error::storage(format!("Failed to delete chunks: {}", e)))?;

        Ok(count)
    }

    fn create_question(&self, question: &Question) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            &format!(
                "INSERT INTO questions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                QUESTION_COLUMNS
            ),
            params![
                question.id.to_string(),
                question.tenant_id,
                question.project_id,
                question.text,
                question.category,
                question.number,
                question.ground_truth,
                question.status.as_str(),
                question.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to create question: {}", e)))?;

        Ok(())
    }

    fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let conn = self.conn.lock();

        let question = conn
            .query_row(
                &format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS),
                params![id.to_string()],
                row_to_question,
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to get question: {}", e)))?;

        Ok(question)
    }

    fn find_question(&self, tenant_id: &str, project_id: &str, text: &str) -> Result<Option<Question>> {
        let conn = self.conn.lock();

        let question = conn
            .query_row(
                &format!(
                    "SELECT {} FROM questions WHERE tenant_id = ?1 AND project_id = ?2 AND text = ?3 \
                     ORDER BY created_at ASC LIMIT 1",
                    QUESTION_COLUMNS
                ),
                params![tenant_id, project_id, text],
                row_to_question,
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to find question: {}", e)))?;

        Ok(question)
    }

    fn update_question_status(&self, id: Uuid, status: QuestionStatus) -> Result<()> {
        let conn = self.conn.lock();

        let updated = conn
            .execute(
                "UPDATE questions SET status = ?2 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )
            .map_err(|e| Error::storage(format!("Failed to update question: {}", e)))?;

        if updated == 0 {
            return Err(Error::not_found("Question", id));
        }
        Ok(())
    }

    fn insert_answer(&self, answer: &Answer) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO answers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                ANSWER_COLUMNS
            ),
            params![
                answer.id.to_string(),
                answer.question_id.to_string(),
                answer.question_text,
                answer.text,
                answer.ai_generated,
                answer.scores.overall as f64,
                answer.scores.retrieval as f64,
                answer.scores.coverage as f64,
                answer.scores.faithfulness as f64,
                answer.scores.relevancy as f64,
                answer.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to insert answer: {}", e)))?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO citations (id, answer_id, chunk_id, document_id, page_number, excerpt, \
                 relevance_score, citation_order) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for citation in &answer.citations {
                stmt.execute(params![
                    citation.id.to_string(),
                    answer.id.to_string(),
                    citation.chunk_id.to_string(),
                    citation.document_id.to_string(),
                    citation.page_number.map(|p| p as i64),
                    citation.excerpt,
                    citation.relevance_score as f64,
                    citation.citation_order as i64,
                ])
                .map_err(|e| Error::storage(format!("Failed to insert citation: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| Error::storage(format!("Failed to commit answer: {}", e)))?;
        Ok(())
    }

    fn get_answer(&self, id: Uuid) -> Result<Option<Answer>> {
        let conn = self.conn.lock();
        Self::query_answer(
            &conn,
            &format!("SELECT {} FROM answers WHERE id = ?1", ANSWER_COLUMNS),
            &id.to_string(),
        )
    }

    fn latest_answer(&self, question_id: Uuid) -> Result<Option<Answer>> {
        let conn = self.conn.lock();
        Self::query_answer(
            &conn,
            &format!(
                "SELECT {} FROM answers WHERE question_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                ANSWER_COLUMNS
            ),
            &question_id.to_string(),
        )
    }
}

fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let format: String = row.get(5)?;
    let file_size: i64 = row.get(6)?;
    let state: String = row.get(8)?;
    let chunk_count: i64 = row.get(9)?;
    let uploaded_at: String = row.get(11)?;
    let processed_at: Option<String> = row.get(12)?;

    Ok(Document {
        id: parse_uuid(0, &id)?,
        tenant_id: row.get(1)?,
        project_id: row.get(2)?,
        filename: row.get(3)?,
        storage_path: row.get(4)?,
        format: DocumentFormat::parse(&format).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                format!("unknown document format '{}'", format).into(),
            )
        })?,
        file_size: file_size as u64,
        file_hash: row.get(7)?,
        state: ProcessingState::parse(&state),
        chunk_count: chunk_count as u32,
        error_message: row.get(10)?,
        uploaded_at: parse_timestamp(11, &uploaded_at)?,
        processed_at: processed_at.as_deref().map(|v| parse_timestamp(12, v)).transpose()?,
    })
}

fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
    let id: String = row.get(0)?;
    let document_id: String = row.get(1)?;
    let chunk_index: i64 = row.get(3)?;
    let page_number: Option<i64> = row.get(5)?;
    let char_start: i64 = row.get(6)?;
    let char_end: i64 = row.get(7)?;
    let token_count: i64 = row.get(9)?;
    let created_at: String = row.get(11)?;

    Ok(Chunk {
        id: parse_uuid(0, &id)?,
        document_id: parse_uuid(1, &document_id)?,
        tenant_id: row.get(2)?,
        chunk_index: chunk_index as u32,
        text: row.get(4)?,
        page_number: page_number.map(|p| p as u32),
        char_start: char_start as usize,
        char_end: char_end as usize,
        content_hash: row.get(8)?,
        token_count: token_count as u32,
        vector_id: row.get(10)?,
        created_at: parse_timestamp(11, &created_at)?,
    })
}

fn row_to_question(row: &rusqlite::Row) -> rusqlite::Result<Question> {
    let id: String = row.get(0)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Question {
        id: parse_uuid(0, &id)?,
        tenant_id: row.get(1)?,
        project_id: row.get(2)?,
        text: row.get(3)?,
        category: row.get(4)?,
        number: row.get(5)?,
        ground_truth: row.get(6)?,
        status: QuestionStatus::parse(&status),
        created_at: parse_timestamp(8, &created_at)?,
    })
}

fn row_to_answer(row: &rusqlite::Row) -> rusqlite::Result<Answer> {
    let id: String = row.get(0)?;
    let question_id: String = row.get(1)?;
    let overall: f64 = row.get(5)?;
    let retrieval: f64 = row.get(6)?;
    let coverage: f64 = row.get(7)?;
    let faithfulness: f64 = row.get(8)?;
    let relevancy: f64 = row.get(9)?;
    let created_at: String = row.get(10)?;

    Ok(Answer {
        id: parse_uuid(0, &id)?,
        question_id: parse_uuid(1, &question_id)?,
        question_text: row.get(2)?,
        text: row.get(3)?,
        ai_generated: row.get(4)?,
        citations: Vec::new(),
        scores: ConfidenceScores {
            overall: overall as f32,
            retrieval: retrieval as f32,
            coverage: coverage as f32,
            faithfulness: faithfulness as f32,
            relevancy: relevancy as f32,
        },
        created_at: parse_timestamp(10, &created_at)?,
    })
}

fn row_to_citation(row: &rusqlite::Row) -> rusqlite::Result<Citation> {
    let id: String = row.get(0)?;
    let answer_id: String = row.get(1)?;
    let chunk_id: String = row.get(2)?;
    let document_id: String = row.get(3)?;
    let page_number: Option<i64> = row.get(4)?;
    let relevance_score: f64 = row.get(6)?;
    let citation_order: i64 = row.get(7)?;

    Ok(Citation {
        id: parse_uuid(0, &id)?,
        answer_id: Some(parse_uuid(1, &answer_id)?),
        chunk_id: parse_uuid(2, &chunk_id)?,
        document_id: parse_uuid(3, &document_id)?,
        page_number: page_number.map(|p| p as u32),
        excerpt: row.get(5)?,
        relevance_score: relevance_score as f32,
        citation_order: citation_order as u32,
    })
}
