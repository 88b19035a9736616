//! Deterministic providers for tests and offline development.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::AssistantError;

use super::{CompletionProvider, EmbeddingProvider};

/// Completion provider that replays a scripted queue of responses.
///
/// Once the script is exhausted it keeps returning the final entry, so a
/// single-entry script behaves like a constant function. An empty script
/// fails every call, which is how tests exercise the hard-failure paths.
#[derive(Default)]
pub struct MockCompletionProvider {
    script: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    /// Creates a provider that replays `responses` in order.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a provider whose every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    /// All prompts the provider has seen, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AssistantError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(next) = self.script.lock().pop_front() {
            *self.last.lock() = Some(next.clone());
            return Ok(next);
        }
        match self.last.lock().clone() {
            Some(last) => Ok(last),
            None => Err(AssistantError::Completion(
                "mock script exhausted with no responses".into(),
            )),
        }
    }
}

/// Hash-based embedding provider: identical text yields identical vectors,
/// different text almost surely differs.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: 16 }
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom vector width.
    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-1a over the text per dimension slot, normalized to unit length.
        let mut vector = Vec::with_capacity(self.dimensions);
        for slot in 0..self.dimensions {
            let mut hash: u64 = 0xcbf29ce484222325 ^ (slot as u64);
            for byte in text.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector.push(((hash % 2000) as f32 / 1000.0) - 1.0);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AssistantError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}
