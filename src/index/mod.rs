//! Vector index lifecycle and the process-wide handle.
//!
//! [`IndexManager`] is the explicitly owned, injectable resource the rest of
//! the assistant talks to. It wraps at most one live [`SqliteVectorIndex`]
//! behind a `tokio::sync::RwLock`: similarity searches take the read half
//! (many concurrent readers), while `create`/`add`/`rebuild` take the write
//! half. `rebuild` is the one destructive operation — it validates the new
//! chunk set *before* deleting the persisted file, because once deletion
//! starts the old index is unrecoverable. A rebuild that fails after
//! deletion leaves the manager indexless, which `load`/`describe` make
//! observable; there is no automatic recovery.

pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AssistantError;
use crate::ingestion::DocumentChunk;
use crate::providers::EmbeddingProvider;

pub use sqlite::{RetrievedChunk, SqliteVectorIndex};

/// Owner of the single live index handle for the process.
pub struct IndexManager {
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    index: RwLock<Option<SqliteVectorIndex>>,
}

impl IndexManager {
    /// Creates a manager for the index persisted at `path`. No I/O happens
    /// until [`load_if_present`](Self::load_if_present) or
    /// [`create`](Self::create) is called.
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            path: path.into(),
            embedder,
            index: RwLock::new(None),
        }
    }

    /// Canonical path of the persisted index.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the persisted index when present. Returns `true` when an index
    /// is live afterwards; absence is a normal state, not an error.
    pub async fn load_if_present(&self) -> Result<bool, AssistantError> {
        let mut guard = self.index.write().await;
        if guard.is_some() {
            return Ok(true);
        }
        match SqliteVectorIndex::open(&self.path).await? {
            Some(index) => {
                info!(path = %self.path.display(), "vector index loaded");
                *guard = Some(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Creates the index from scratch. Errors on an empty chunk set.
    pub async fn create(&self, chunks: &[DocumentChunk]) -> Result<(), AssistantError> {
        let mut guard = self.index.write().await;
        let index = SqliteVectorIndex::create(&self.path, chunks).await?;
        *guard = Some(index);
        Ok(())
    }

    /// Appends chunks to the live index. Errors when no index is loaded;
    /// appending to nothing is a caller bug, not a degraded state.
    pub async fn add(&self, chunks: &[DocumentChunk]) -> Result<(), AssistantError> {
        let guard = self.index.write().await;
        let index = guard.as_ref().ok_or(AssistantError::IndexAbsent)?;
        index.insert(chunks).await?;
        info!(chunks = chunks.len(), "vector index extended");
        Ok(())
    }

    /// Replaces the index wholesale with `chunks`.
    ///
    /// The non-empty check runs before anything is deleted, so a rejected
    /// rebuild leaves the existing index fully intact and loadable.
    pub async fn rebuild(&self, chunks: &[DocumentChunk]) -> Result<(), AssistantError> {
        if chunks.is_empty() {
            return Err(AssistantError::EmptyChunkSet);
        }

        let mut guard = self.index.write().await;
        *guard = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        match SqliteVectorIndex::create(&self.path, chunks).await {
            Ok(index) => {
                *guard = Some(index);
                info!(chunks = chunks.len(), "vector index rebuilt");
                Ok(())
            }
            Err(err) => {
                // Old index already deleted; stay indexless and observable.
                warn!(error = %err, "rebuild failed after deletion; index is now absent");
                Err(err)
            }
        }
    }

    /// Embeds `query` and returns up to `k` nearest chunks. An absent index
    /// yields an empty result, never an error — callers treat empty context
    /// as a valid degraded state.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, AssistantError> {
        let query_embedding = self.embedder.embed(query).await?;
        let guard = self.index.read().await;
        match guard.as_ref() {
            Some(index) => index.search(&query_embedding, k).await,
            None => Ok(Vec::new()),
        }
    }

    /// Unique source count and filenames; `(0, [])` when no index is live.
    pub async fn describe(&self) -> Result<(usize, Vec<String>), AssistantError> {
        let guard = self.index.read().await;
        match guard.as_ref() {
            Some(index) => index.describe().await,
            None => Ok((0, Vec::new())),
        }
    }

    /// Whether an index is currently live in memory.
    pub async fn is_loaded(&self) -> bool {
        self.index.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbeddingProvider;
    use tempfile::tempdir;

    fn chunk(id: &str, source: &str, text: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            source: source.to_string(),
            text: text.to_string(),
            embedding,
        }
    }

    fn manager(path: &std::path::Path) -> IndexManager {
        IndexManager::new(path, Arc::new(MockEmbeddingProvider::with_dimensions(4)))
    }

    #[tokio::test]
    async fn search_without_index_returns_empty() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir.path().join("idx.sqlite"));
        let hits = manager.search("anything", 5).await.unwrap();
        assert!(hits.is_empty());
        assert!(!manager.is_loaded().await);
    }

    #[tokio::test]
    async fn add_without_index_is_an_error() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir.path().join("idx.sqlite"));
        let err = manager
            .add(&[chunk("a", "s", "t", vec![0.0; 4])])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::IndexAbsent));
    }

    #[tokio::test]
    async fn create_rejects_empty_chunk_set() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir.path().join("idx.sqlite"));
        assert!(matches!(
            manager.create(&[]).await.unwrap_err(),
            AssistantError::EmptyChunkSet
        ));
    }

    #[tokio::test]
    async fn empty_rebuild_fails_before_touching_the_old_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.sqlite");
        let mgr = manager(&path);
        mgr
            .create(&[chunk("a", "alpha", "alpha text", vec![1.0, 0.0, 0.0, 0.0])])
            .await
            .unwrap();

        assert!(matches!(
            mgr.rebuild(&[]).await.unwrap_err(),
            AssistantError::EmptyChunkSet
        ));

        // The persisted file survives and still loads.
        let reopened = manager(&path);
        assert!(reopened.load_if_present().await.unwrap());
        let (count, sources) = reopened.describe().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(sources, vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn rebuild_replaces_contents() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir.path().join("idx.sqlite"));
        manager
            .create(&[chunk("a", "old", "old text", vec![1.0, 0.0, 0.0, 0.0])])
            .await
            .unwrap();
        manager
            .rebuild(&[chunk("b", "new", "new text", vec![0.0, 1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let (count, sources) = manager.describe().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(sources, vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn describe_deduplicates_sources() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir.path().join("idx.sqlite"));
        manager
            .create(&[
                chunk("a", "beta", "one", vec![1.0, 0.0, 0.0, 0.0]),
                chunk("b", "beta", "two", vec![0.0, 1.0, 0.0, 0.0]),
                chunk("c", "alpha", "three", vec![0.0, 0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let (count, sources) = manager.describe().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(sources, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[tokio::test]
    async fn search_orders_by_distance() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir.path().join("idx.sqlite"));
        let embedder = MockEmbeddingProvider::with_dimensions(4);
        let near = crate::providers::EmbeddingProvider::embed(&embedder, "query text")
            .await
            .unwrap();

        manager
            .create(&[
                chunk("near", "s1", "almost the query", near.clone()),
                chunk("far", "s2", "unrelated text", vec![-near[0], -near[1], -near[2], -near[3]]),
            ])
            .await
            .unwrap();

        let hits = manager.search("query text", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "almost the query");
        assert!(hits[0].distance <= hits[1].distance);
    }
}
