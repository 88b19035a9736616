//! SQLite-backed vector persistence via `sqlite-vec`.
//!
//! One index is one SQLite file: a `chunks` table for content and
//! provenance, a `chunks_embeddings` vec0 virtual table joined by rowid, and
//! a `meta` table recording the embedding width so later appends can be
//! validated against it.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use tokio_rusqlite::{Connection, ffi, rusqlite};
use tracing::info;

use crate::error::AssistantError;
use crate::ingestion::DocumentChunk;

/// A chunk returned by similarity search, nearest first.
#[derive(Clone, Debug)]
pub struct RetrievedChunk {
    pub source: String,
    pub text: String,
    /// Cosine distance to the query (smaller is closer).
    pub distance: f32,
}

/// Open handle to one persisted index file.
#[derive(Clone)]
pub struct SqliteVectorIndex {
    conn: Connection,
    dimensions: usize,
}

impl SqliteVectorIndex {
    /// Creates a fresh index at `path` from a non-empty chunk set.
    pub async fn create(
        path: impl AsRef<Path>,
        chunks: &[DocumentChunk],
    ) -> Result<Self, AssistantError> {
        if chunks.is_empty() {
            return Err(AssistantError::EmptyChunkSet);
        }
        let dimensions = chunks[0].embedding.len();
        if dimensions == 0 {
            return Err(AssistantError::Storage("zero-width embedding".into()));
        }

        register_sqlite_vec()?;
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|err| AssistantError::Storage(err.to_string()))?;

        conn.call(move |conn| -> rusqlite::Result<()> {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS chunks (
                     id TEXT PRIMARY KEY,
                     source TEXT,
                     content TEXT
                 );
                 CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
                 CREATE VIRTUAL TABLE IF NOT EXISTS chunks_embeddings
                     USING vec0(embedding float[{dimensions}]);
                 CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);"
            ))?;
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES ('dimensions', ?1)",
                [dimensions.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(|err| AssistantError::Storage(err.to_string()))?;

        let index = Self { conn, dimensions };
        index.insert(chunks).await?;
        info!(chunks = chunks.len(), dimensions, "vector index created");
        Ok(index)
    }

    /// Opens the index persisted at `path`, or `None` when the file is
    /// absent. Absence is a normal startup state, not a failure.
    pub async fn open(path: impl AsRef<Path>) -> Result<Option<Self>, AssistantError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| AssistantError::Storage(err.to_string()))?;

        let dimensions: usize = conn
            .call(|conn| -> rusqlite::Result<String> {
                let value: String = conn.query_row(
                    "SELECT value FROM meta WHERE key = 'dimensions'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(value)
            })
            .await
            .map_err(|err| {
                AssistantError::Storage(format!("index file present but unreadable: {err}"))
            })?
            .parse()
            .map_err(|_| AssistantError::Storage("corrupt dimensions metadata".into()))?;

        Ok(Some(Self { conn, dimensions }))
    }

    /// Appends chunks to the live index. Empty input is a no-op.
    pub async fn insert(&self, chunks: &[DocumentChunk]) -> Result<(), AssistantError> {
        if chunks.is_empty() {
            return Ok(());
        }
        for chunk in chunks {
            if chunk.embedding.len() != self.dimensions {
                return Err(AssistantError::Storage(format!(
                    "embedding width {} does not match index width {}",
                    chunk.embedding.len(),
                    self.dimensions
                )));
            }
        }

        let rows: Vec<(String, String, String, String)> = chunks
            .iter()
            .map(|chunk| {
                let embedding = serde_json::to_string(&chunk.embedding)
                    .map_err(|err| AssistantError::Storage(err.to_string()))?;
                Ok((
                    chunk.id.clone(),
                    chunk.source.clone(),
                    chunk.text.clone(),
                    embedding,
                ))
            })
            .collect::<Result<_, AssistantError>>()?;

        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                let tx = conn.transaction()?;
                for (id, source, content, embedding) in rows {
                    tx.execute(
                        "INSERT INTO chunks (id, source, content) VALUES (?1, ?2, ?3)",
                        (&id, &source, &content),
                    )?;
                    let rowid = tx.last_insert_rowid();
                    tx.execute(
                        "INSERT INTO chunks_embeddings (rowid, embedding) VALUES (?1, ?2)",
                        (rowid, &embedding),
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| AssistantError::Storage(err.to_string()))
    }

    /// Returns the `k` nearest chunks by cosine distance.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, AssistantError> {
        let embedding = serde_json::to_string(query_embedding)
            .map_err(|err| AssistantError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| -> rusqlite::Result<Vec<RetrievedChunk>> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT c.source, c.content,
                            vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance
                     FROM chunks c
                     JOIN chunks_embeddings e ON e.rowid = c.rowid
                     ORDER BY distance ASC
                     LIMIT {k}"
                ))?;
                let rows = stmt.query_map([&embedding], |row| {
                    Ok(RetrievedChunk {
                        source: row.get(0)?,
                        text: row.get(1)?,
                        distance: row.get(2)?,
                    })
                })?;
                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| AssistantError::Storage(err.to_string()))
    }

    /// Unique source filenames in the index, sorted, with their count.
    pub async fn describe(&self) -> Result<(usize, Vec<String>), AssistantError> {
        self.conn
            .call(|conn| -> rusqlite::Result<Vec<String>> {
                let mut stmt =
                    conn.prepare("SELECT DISTINCT source FROM chunks ORDER BY source")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut sources = Vec::new();
                for row in rows {
                    sources.push(row?);
                }
                Ok(sources)
            })
            .await
            .map(|sources| (sources.len(), sources))
            .map_err(|err| AssistantError::Storage(err.to_string()))
    }

    /// Total chunk count.
    pub async fn count(&self) -> Result<usize, AssistantError> {
        self.conn
            .call(|conn| -> rusqlite::Result<usize> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| AssistantError::Storage(err.to_string()))
    }

    /// Embedding width this index was created with.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn register_sqlite_vec() -> Result<(), AssistantError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTERED
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != ffi::SQLITE_OK {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            } else {
                Ok(())
            }
        })
        .clone()
        .map_err(AssistantError::Storage)
}
