//! External document providers and batch chunking.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::AssistantError;

use super::chunker::{DocumentChunk, SemanticChunker};

/// One raw document yielded by a [`DocumentSource`].
#[derive(Clone, Debug)]
pub struct SourceDocument {
    /// Logical name recorded as chunk provenance (usually the file stem).
    pub name: String,
    /// Raw text content.
    pub text: String,
}

/// A bulk provider of raw documents.
///
/// The rebuild path consumes this seam; concrete implementations decide
/// where documents live (a local directory, a shared drive behind
/// credentials, an object store). Listing failures are errors; a single
/// unreadable document is the implementation's to skip and report.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetches every available document as `(name, text)` pairs.
    async fn fetch_documents(&self) -> Result<Vec<SourceDocument>, AssistantError>;
}

/// Reads `.txt` and `.md` files from a local directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn fetch_documents(&self) -> Result<Vec<SourceDocument>, AssistantError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %self.dir.display(), "document directory missing");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| AssistantError::Source(err.to_string()))?
        {
            let path = entry.path();
            let extension = path.extension().and_then(|ext| ext.to_str());
            if !matches!(extension, Some("txt") | Some("md")) {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("document")
                .to_string();
            // Unreadable files are skipped, not fatal for the batch.
            match fs::read_to_string(&path).await {
                Ok(text) => documents.push(SourceDocument { name, text }),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable document");
                }
            }
        }
        Ok(documents)
    }
}

/// Chunks a batch of documents in parallel, joining before returning.
///
/// Per-document failures are skipped and reported via `tracing::warn!` so a
/// malformed document never aborts the batch. The caller decides what an
/// empty combined result means (bootstrap skips index creation; rebuild
/// refuses to delete the old index).
pub async fn chunk_documents(
    chunker: &SemanticChunker,
    documents: Vec<SourceDocument>,
) -> Vec<DocumentChunk> {
    let mut tasks = JoinSet::new();
    for document in documents {
        let chunker = chunker.clone();
        tasks.spawn(async move {
            let result = chunker.chunk_document(&document.name, &document.text).await;
            (document.name, result)
        });
    }

    let mut chunks = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(mut document_chunks))) => {
                info!(source = %name, count = document_chunks.len(), "document chunked");
                chunks.append(&mut document_chunks);
            }
            Ok((name, Err(err))) => {
                warn!(source = %name, error = %err, "skipping document that failed to chunk");
            }
            Err(err) => {
                warn!(error = %err, "chunking task panicked; skipping its document");
            }
        }
    }
    chunks
}

/// Convenience alias for shared sources.
pub type SharedDocumentSource = Arc<dyn DocumentSource>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbeddingProvider;
    use tempfile::tempdir;

    fn chunker() -> SemanticChunker {
        SemanticChunker::new(Arc::new(MockEmbeddingProvider::new()), 40, 0.5)
    }

    #[tokio::test]
    async fn directory_source_reads_supported_files() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "Alpha compound details.")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("b.md"), "Beta compound details.")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("c.bin"), [0u8, 159, 146, 150])
            .await
            .unwrap();

        let source = DirectorySource::new(dir.path());
        let mut documents = source.fetch_documents().await.unwrap();
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].name, "a");
        assert_eq!(documents[1].name, "b");
    }

    #[tokio::test]
    async fn missing_directory_is_empty_not_fatal() {
        let source = DirectorySource::new("definitely/not/here");
        assert!(source.fetch_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_chunking_joins_all_documents() {
        let documents = vec![
            SourceDocument {
                name: "one".into(),
                text: "The first compound sits in the west. It has parks.".into(),
            },
            SourceDocument {
                name: "two".into(),
                text: "The second compound sits by the coast. It has a marina.".into(),
            },
        ];
        let chunks = chunk_documents(&chunker(), documents).await;
        assert!(chunks.iter().any(|c| c.source == "one"));
        assert!(chunks.iter().any(|c| c.source == "two"));
    }
}
