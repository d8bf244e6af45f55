//! Persistent vector index on SQLite
//!
//! Vectors are stored as little-endian f32 blobs and scanned brute force per
//! namespace, which is adequate for per-project corpora.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{rank_matches, Namespace};
use crate::error::{Error, Result};
use crate::providers::{VectorIndex, VectorMatch, VectorMetadata, VectorRecord};

/// SQLite-backed vector index
pub struct SqliteVectorIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorIndex {
    /// Create or open the index at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open vector index: {}", e)))?;
        Self::with_connection(conn)
    }

    /// In-memory index (tests, throwaway runs)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory vector index: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS vectors (
                namespace TEXT NOT NULL,
                vector_id TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                page_number INTEGER,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (namespace, vector_id)
            );
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await?
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn column_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<VectorRecord> {
    let vector_id: String = row.get(0)?;
    let chunk_id: String = row.get(1)?;
    let document_id: String = row.get(2)?;
    let chunk_index: i64 = row.get(3)?;
    let page_number: Option<i64> = row.get(4)?;
    let text: String = row.get(5)?;
    let blob: Vec<u8> = row.get(6)?;

    Ok(VectorRecord {
        vector_id,
        vector: decode_vector(&blob),
        text,
        metadata: VectorMetadata {
            chunk_id: column_uuid(1, &chunk_id)?,
            document_id: column_uuid(2, &document_id)?,
            chunk_index: chunk_index as u32,
            page_number: page_number.map(|p| p as u32),
        },
    })
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn add(&self, namespace: &Namespace, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let namespace = namespace.to_string();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT OR REPLACE INTO vectors (
                        namespace, vector_id, chunk_id, document_id, chunk_index,
                        page_number, text, embedding
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )?;
                for record in &records {
                    stmt.execute(params![
                        namespace,
                        record.vector_id,
                        record.metadata.chunk_id.to_string(),
                        record.metadata.document_id.to_string(),
                        record.metadata.chunk_index as i64,
                        record.metadata.page_number.map(|p| p as i64),
                        record.text,
                        encode_vector(&record.vector),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        let namespace = namespace.to_string();
        let query = vector.to_vec();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT vector_id, chunk_id, document_id, chunk_index, page_number, text, embedding
                FROM vectors WHERE namespace = ?1
                "#,
            )?;
            let records = stmt
                .query_map(params![namespace], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rank_matches(records, &query, k))
        })
        .await
    }

    async fn delete(&self, namespace: &Namespace, vector_ids: &[String]) -> Result<usize> {
        let namespace = namespace.to_string();
        let ids = vector_ids.to_vec();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM vectors WHERE namespace = ?1 AND vector_id = ?2")?;
                for id in &ids {
                    removed += stmt.execute(params![namespace, id])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize> {
        let namespace = namespace.to_string();
        self.run(move |conn| Ok(conn.execute("DELETE FROM vectors WHERE namespace = ?1", params![namespace])?))
            .await
    }

    async fn count(&self, namespace: &Namespace) -> Result<usize> {
        let namespace = namespace.to_string();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM vectors WHERE namespace = ?1",
                params![namespace],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
