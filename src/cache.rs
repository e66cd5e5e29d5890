use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CacheError, PipelineError};
use crate::util::{ensure_directory, sha256_hex};

pub trait CacheStore {
    /// Fails with [`CacheError::NotFound`] when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Vec<String>, CacheError>;

    fn store(&self, key: &str, sentences: &[String]) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheEntrySummary {
    pub submission_id: String,
    pub sentence_count: i64,
    pub stored_at: DateTime<Utc>,
    pub content_hash: String,
}

pub struct SqliteCacheStore {
    connection: Connection,
}

impl SqliteCacheStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            ensure_directory(parent)?;
        }
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open cache database: {}", db_path.display()))?;
        connection
            .pragma_update(None, "journal_mode", "WAL")
            .context("failed to set journal_mode=WAL")?;
        connection
            .pragma_update(None, "synchronous", "NORMAL")
            .context("failed to set synchronous=NORMAL")?;

        Self::with_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory cache database")?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS preprocessed_sentences (
                  submission_id TEXT PRIMARY KEY,
                  sentences_json TEXT NOT NULL,
                  sentence_count INTEGER NOT NULL,
                  content_hash TEXT NOT NULL,
                  stored_at TEXT NOT NULL
                );
                ",
            )
            .context("failed to ensure cache schema")?;
        Ok(Self { connection })
    }

    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.connection.execute(
            "DELETE FROM preprocessed_sentences WHERE submission_id = ?1",
            params![key],
        )?;
        Ok(removed > 0)
    }

    pub fn count(&self) -> Result<i64, CacheError> {
        let count = self.connection.query_row(
            "SELECT COUNT(*) FROM preprocessed_sentences",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn recent_entries(&self, limit: usize) -> Result<Vec<CacheEntrySummary>, CacheError> {
        let mut statement = self.connection.prepare(
            "
            SELECT submission_id, sentence_count, stored_at, content_hash
            FROM preprocessed_sentences
            ORDER BY stored_at DESC, submission_id ASC
            LIMIT ?1
            ",
        )?;

        let mut rows = statement.query(params![limit as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(CacheEntrySummary {
                submission_id: row.get(0)?,
                sentence_count: row.get(1)?,
                stored_at: row.get(2)?,
                content_hash: row.get(3)?,
            });
        }

        Ok(out)
    }
}

impl CacheStore for SqliteCacheStore {
    fn load(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let encoded: Option<String> = self
            .connection
            .query_row(
                "SELECT sentences_json FROM preprocessed_sentences WHERE submission_id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        let encoded = encoded.ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        Ok(serde_json::from_str(&encoded)?)
    }

    fn store(&self, key: &str, sentences: &[String]) -> Result<(), CacheError> {
        let encoded = serde_json::to_string(sentences)?;
        let content_hash = sha256_hex(encoded.as_bytes());

        self.connection.execute(
            "
            INSERT INTO preprocessed_sentences(submission_id, sentences_json, sentence_count, content_hash, stored_at)
            VALUES(?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(submission_id) DO UPDATE SET
              sentences_json=excluded.sentences_json,
              sentence_count=excluded.sentence_count,
              content_hash=excluded.content_hash,
              stored_at=excluded.stored_at
            ",
            params![
                key,
                encoded,
                sentences.len() as i64,
                content_hash,
                Utc::now(),
            ],
        )?;

        Ok(())
    }
}

/// There is no locking: concurrent misses for one id both compute and the
/// last write wins.
pub struct FreshnessCache<S> {
    store: S,
}

impl<S: CacheStore> FreshnessCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get_or_compute<F>(
        &self,
        submission_id: &str,
        force_recompute: bool,
        compute: F,
    ) -> Result<Vec<String>, PipelineError>
    where
        F: FnOnce() -> Result<Vec<String>, PipelineError>,
    {
        if !force_recompute {
            match self.store.load(submission_id) {
                Ok(sentences) => {
                    info!(submission_id, count = sentences.len(), "loaded cached sentences");
                    return Ok(sentences);
                }
                Err(CacheError::NotFound(_)) => {
                    info!(submission_id, "no cached sentences, computing");
                }
                Err(CacheError::Encode(err)) => {
                    warn!(submission_id, error = %err, "cached entry is unreadable, recomputing");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let sentences = compute()?;
        self.store.store(submission_id, &sentences)?;
        info!(submission_id, count = sentences.len(), "stored computed sentences");
        Ok(sentences)
    }
}
