//! SQLite cache for embeddings using rusqlite
//!
//! Vectors are keyed by a SHA-256 of the model name and the embedded text,
//! so switching models never returns a stale vector.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use clozify_core::EmbeddingVector;

use crate::error::{EmbeddingError, Result};

/// SQLite store for embeddings
pub struct EmbeddingCache {
    conn: Mutex<Connection>,
}

impl EmbeddingCache {
    /// Open (or create) a cache database at `database_path`
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        info!("Opening embedding cache: {:?}", database_path.as_ref());
        let conn = Connection::open(database_path.as_ref()).map_err(|e| {
            EmbeddingError::Database(format!("Failed to open database: {}", e))
        })?;
        Self::with_connection(conn)
    }

    /// Create an in-memory cache (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS embeddings (
                key TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                embedding BLOB NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Cache key for a piece of text embedded by `model`
    pub fn key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0x1f_u8]);
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up a cached embedding
    pub fn get(&self, model: &str, text: &str) -> Result<Option<EmbeddingVector>> {
        let key = Self::key(model, text);
        let conn = self.conn.lock();
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM embeddings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match bytes {
            Some(bytes) => {
                let (embedding, _): (EmbeddingVector, usize) =
                    bincode::decode_from_slice(&bytes, bincode::config::standard())
                        .map_err(|e| EmbeddingError::Serialization(e.to_string()))?;
                Ok(Some(embedding))
            }
            None => Ok(None),
        }
    }

    /// Save or update an embedding
    pub fn put(&self, model: &str, text: &str, embedding: &[f32]) -> Result<()> {
        let key = Self::key(model, text);
        let bytes = bincode::encode_to_vec(embedding, bincode::config::standard())
            .map_err(|e| EmbeddingError::Serialization(e.to_string()))?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO embeddings (key, model, dimension, embedding)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                dimension = excluded.dimension,
                embedding = excluded.embedding",
            params![key, model, embedding.len() as i64, bytes],
        )?;
        debug!("Cached embedding for key {}", key);
        Ok(())
    }

    /// Remove every cached embedding, returning how many were deleted
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM embeddings", [])?;
        info!("Cleared {} cached embeddings", deleted);
        Ok(deleted)
    }

    /// Get statistics about stored embeddings
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn.lock();
        let entries: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        let models: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT model) FROM embeddings",
            [],
            |row| row.get(0),
        )?;
        Ok(CacheStats {
            entries: entries as usize,
            models: models as usize,
        })
    }
}

/// Statistics about the embedding cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub models: usize,
}
