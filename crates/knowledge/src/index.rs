//! SQLite-backed vector index for knowledge chunks.

use crate::types::{KnowledgeChunk, KnowledgeSource};
use crate::vector_index::{cosine_similarity, VectorIndex};
use scholar_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Persistent vector index over a SQLite database.
///
/// Embeddings are stored as little-endian f32 blobs; search is a full
/// cosine-similarity scan with top-k truncation, which is adequate for the
/// corpus sizes this tool targets (tens of documents, thousands of chunks).
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) the index database at the given path.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id TEXT PRIMARY KEY,
                path TEXT,
                url TEXT,
                content_type TEXT NOT NULL,
                learned_at TEXT NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT,
                FOREIGN KEY (source_id) REFERENCES sources(id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a source record.
    pub fn insert_source(&self, source: &KnowledgeSource) -> AppResult<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT OR REPLACE INTO sources (id, path, url, content_type, learned_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    source.id,
                    source
                        .path
                        .as_ref()
                        .map(|p| p.to_string_lossy().to_string()),
                    source.url,
                    source.content_type,
                    source.learned_at.to_rfc3339(),
                    source.size_bytes as i64,
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

        Ok(())
    }
}

impl VectorIndex for SqliteIndex {
    fn upsert_chunk(&mut self, chunk: &KnowledgeChunk) -> AppResult<()> {
        let embedding_bytes = embedding_to_bytes(
            chunk
                .embedding
                .as_ref()
                .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?,
        );

        let metadata_json = serde_json::to_string(&chunk.metadata)
            .map_err(|e| AppError::Knowledge(format!("Failed to serialize metadata: {}", e)))?;

        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.id,
                    chunk.source_id,
                    chunk.position as i64,
                    chunk.text,
                    embedding_bytes,
                    metadata_json,
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

        Ok(())
    }

    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let chunks_iter = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let embedding = bytes_to_embedding(&embedding_bytes)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

                let metadata_json: String = row.get(5)?;
                let metadata: serde_json::Value = serde_json::from_str(&metadata_json)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

                Ok(KnowledgeChunk {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    embedding: Some(embedding),
                    metadata,
                })
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut results: Vec<(KnowledgeChunk, f32)> = chunks_iter
            .filter_map(|r| r.ok())
            .map(|chunk| {
                let score = chunk
                    .embedding
                    .as_ref()
                    .map(|e| cosine_similarity(query_embedding, e))
                    .unwrap_or(0.0);
                (chunk, score)
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn stats(&self) -> AppResult<(u32, u32)> {
        let conn = self.conn.lock().unwrap();
        let sources_count: u32 = conn
            .query_row("SELECT COUNT(*) FROM sources", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

        let chunks_count: u32 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

        Ok((sources_count, chunks_count))
    }

    fn reset(&mut self) -> AppResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;

        conn.execute("DELETE FROM sources", [])
            .map_err(|e| AppError::Knowledge(format!("Failed to delete sources: {}", e)))?;

        tracing::info!("Reset knowledge base index");
        Ok(())
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        embedding.push(value);
    }

    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn test_chunk(id: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: "src-1".to_string(),
            position: 0,
            text: format!("chunk {}", id),
            embedding: Some(embedding),
            metadata: serde_json::json!({}),
        }
    }

    fn test_source() -> KnowledgeSource {
        KnowledgeSource {
            id: "src-1".to_string(),
            path: None,
            url: None,
            content_type: "text".to_string(),
            learned_at: Utc::now(),
            size_bytes: 10,
        }
    }

    #[test]
    fn test_open_creates_tables() {
        let temp_file = NamedTempFile::new().unwrap();
        let index = SqliteIndex::open(temp_file.path()).unwrap();

        let table_count: i64 = index
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert!(table_count >= 2); // sources and chunks tables
    }

    #[test]
    fn test_upsert_and_search() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut index = SqliteIndex::open(temp_file.path()).unwrap();

        index.insert_source(&test_source()).unwrap();
        index.upsert_chunk(&test_chunk("a", vec![1.0, 0.0, 0.0])).unwrap();
        index.upsert_chunk(&test_chunk("b", vec![0.0, 1.0, 0.0])).unwrap();
        index.upsert_chunk(&test_chunk("c", vec![0.9, 0.1, 0.0])).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "a");
        assert_eq!(results[1].0.id, "c");
        assert!(results[0].1 >= results[1].1);
    }

    #[test]
    fn test_stats_and_reset() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut index = SqliteIndex::open(temp_file.path()).unwrap();

        index.insert_source(&test_source()).unwrap();
        index.upsert_chunk(&test_chunk("a", vec![1.0, 0.0])).unwrap();

        let (sources, chunks) = index.stats().unwrap();
        assert_eq!((sources, chunks), (1, 1));

        index.reset().unwrap();
        let (sources, chunks) = index.stats().unwrap();
        assert_eq!((sources, chunks), (0, 0));
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let original = vec![0.5_f32, -1.25, 3.75, 0.0];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_invalid_embedding_bytes() {
        assert!(bytes_to_embedding(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_missing_embedding_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut index = SqliteIndex::open(temp_file.path()).unwrap();

        let mut chunk = test_chunk("a", vec![]);
        chunk.embedding = None;
        assert!(index.upsert_chunk(&chunk).is_err());
    }
}
