//! Language-model capability seams.
//!
//! The assistant consumes two opaque capabilities: text completion (used by
//! the classifier, refinement, and answer stages) and embedding (used by
//! ingestion and the index store). Both sit behind async traits so the
//! routing and retrieval layers never touch a wire format, and tests swap in
//! the deterministic implementations from [`mock`].
//!
//! Neither trait retries; retry and timeout policy belong to callers.

pub mod mock;
pub mod openai;

use async_trait::async_trait;

use crate::error::AssistantError;

pub use mock::{MockCompletionProvider, MockEmbeddingProvider};
pub use openai::OpenAiProvider;

/// Single-shot text completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends one prompt and returns the raw model output.
    async fn complete(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// Text-to-vector embedding.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError>;

    /// Embeds a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AssistantError>;
}
