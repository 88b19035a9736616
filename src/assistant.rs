//! The assembled assistant: the capability surface an API layer calls.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::AssistantError;
use crate::index::IndexManager;
use crate::ingestion::{
    DirectorySource, DocumentSource, SemanticChunker, SourceDocument, chunk_documents,
};
use crate::message::Message;
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::rag::RagPipeline;
use crate::routing::{ConversationRouter, TurnClassifier};
use crate::state::ConversationState;
use crate::units::UnitsGenerator;

/// Observable state of a background index rebuild.
#[derive(Clone, Debug)]
pub enum RebuildStatus {
    Running,
    Completed { chunks: usize },
    Failed(String),
    Cancelled,
}

/// Handle to a scheduled rebuild: poll its status or cancel it.
#[derive(Clone)]
pub struct RebuildHandle {
    status: Arc<RwLock<RebuildStatus>>,
    abort: AbortHandle,
}

impl RebuildHandle {
    /// Current status of the job.
    pub async fn status(&self) -> RebuildStatus {
        self.status.read().await.clone()
    }

    /// Aborts the job. Cancellation before the old index is deleted leaves
    /// it untouched; the status becomes [`RebuildStatus::Cancelled`] once
    /// the abort lands.
    pub fn cancel(&self) {
        self.abort.abort();
    }
}

/// Top-level assembly of router, RAG pipeline, index, and ingestion.
pub struct Assistant {
    settings: Settings,
    router: ConversationRouter,
    index: Arc<IndexManager>,
    chunker: SemanticChunker,
    last_rebuild: Mutex<Option<RebuildHandle>>,
}

impl Assistant {
    /// Wires the assistant from its capability seams.
    pub fn new(
        settings: Settings,
        completion: Arc<dyn CompletionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        units: Arc<dyn UnitsGenerator>,
    ) -> Self {
        let index = Arc::new(IndexManager::new(&settings.index_path, embedder.clone()));
        let chunker = SemanticChunker::new(
            embedder,
            settings.min_chunk_size,
            settings.breakpoint_threshold,
        );
        let classifier = TurnClassifier::new(completion.clone());
        let rag = RagPipeline::new(completion, index.clone(), settings.retrieval_k);
        let router = ConversationRouter::new(classifier, rag, units, settings.call_timeout);
        Self {
            settings,
            router,
            index,
            chunker,
            last_rebuild: Mutex::new(None),
        }
    }

    /// Loads the persisted index, or builds it from the configured source
    /// directory when absent. An empty or missing corpus leaves the
    /// assistant indexless (a reported, non-fatal condition: RAG turns then
    /// answer with empty context).
    pub async fn bootstrap(&self) -> Result<(), AssistantError> {
        if self.index.load_if_present().await? {
            return Ok(());
        }

        info!(dir = %self.settings.source_dir.display(), "no index found; ingesting default corpus");
        let source = DirectorySource::new(&self.settings.source_dir);
        let documents = source.fetch_documents().await?;
        let chunks = chunk_documents(&self.chunker, documents).await;
        if chunks.is_empty() {
            warn!("default corpus produced no chunks; starting without an index");
            return Ok(());
        }
        self.index.create(&chunks).await
    }

    /// Handles one conversation turn. See
    /// [`ConversationRouter::handle_turn`] for seed-history semantics.
    pub async fn handle_turn(
        &self,
        user_id: &str,
        user_text: &str,
        seed_history: Option<Vec<Message>>,
    ) -> String {
        self.router.handle_turn(user_id, user_text, seed_history).await
    }

    /// Unique source count and filenames currently indexed.
    pub async fn index_info(&self) -> Result<(usize, Vec<String>), AssistantError> {
        self.index.describe().await
    }

    /// Chunks one uploaded document and appends it to the live index.
    ///
    /// Errors when no index is live ([`AssistantError::IndexAbsent`]) or the
    /// bytes are not UTF-8 text.
    pub async fn update_index_with_document(
        &self,
        name: &str,
        raw: &[u8],
    ) -> Result<usize, AssistantError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| AssistantError::Source(format!("document '{name}' is not UTF-8 text")))?;
        let chunks = self.chunker.chunk_document(name, text).await?;
        if chunks.is_empty() {
            return Err(AssistantError::Chunking(format!(
                "document '{name}' produced no chunks"
            )));
        }
        self.index.add(&chunks).await?;
        info!(source = name, chunks = chunks.len(), "index updated with uploaded document");
        Ok(chunks.len())
    }

    /// Schedules a full rebuild from an external document source and returns
    /// immediately with a handle to the background job.
    ///
    /// The destructive delete happens only after the new corpus has been
    /// fetched, chunked, and found non-empty; fetching failures and empty
    /// corpora fail the job with the old index intact. A crash between
    /// delete and recreate leaves the assistant indexless, which
    /// [`index_info`](Self::index_info) makes visible.
    pub fn rebuild_index_from_source(
        &self,
        source: Arc<dyn DocumentSource>,
    ) -> RebuildHandle {
        let status = Arc::new(RwLock::new(RebuildStatus::Running));
        let index = self.index.clone();
        let chunker = self.chunker.clone();
        let job_status = status.clone();

        let task = tokio::spawn(async move {
            let result = run_rebuild(&chunker, index, source).await;
            let mut guard = job_status.write().await;
            *guard = match result {
                Ok(chunks) => {
                    info!(chunks, "background rebuild completed");
                    RebuildStatus::Completed { chunks }
                }
                Err(err) => {
                    warn!(error = %err, "background rebuild failed");
                    RebuildStatus::Failed(err.to_string())
                }
            };
        });

        let handle = RebuildHandle {
            status: status.clone(),
            abort: task.abort_handle(),
        };

        // Flip the status when the task was aborted rather than finishing.
        let watcher_status = status;
        tokio::spawn(async move {
            if let Err(join_err) = task.await {
                if join_err.is_cancelled() {
                    *watcher_status.write().await = RebuildStatus::Cancelled;
                }
            }
        });

        let mut last = self.last_rebuild.lock();
        *last = Some(handle.clone());
        handle
    }

    /// Status of the most recently scheduled rebuild, if any.
    pub async fn rebuild_status(&self) -> Option<RebuildStatus> {
        let handle = self.last_rebuild.lock().clone();
        match handle {
            Some(handle) => Some(handle.status().await),
            None => None,
        }
    }

    /// Copies one user's conversation state for introspection.
    pub async fn conversation(&self, user_id: &str) -> Option<ConversationState> {
        self.router.state_snapshot(user_id).await
    }
}

async fn run_rebuild(
    chunker: &SemanticChunker,
    index: Arc<IndexManager>,
    source: Arc<dyn DocumentSource>,
) -> Result<usize, AssistantError> {
    let documents: Vec<SourceDocument> = source.fetch_documents().await?;
    if documents.is_empty() {
        return Err(AssistantError::Source(
            "document source returned no documents".into(),
        ));
    }
    let chunks = chunk_documents(chunker, documents).await;
    index.rebuild(&chunks).await?;
    Ok(chunks.len())
}
