//! Embedding-distance semantic chunking.
//!
//! Documents are split at semantic breakpoints rather than fixed sizes: each
//! sentence is embedded, cosine distances between consecutive sentences are
//! computed, and the largest jumps become chunk boundaries. The target chunk
//! count is derived from the word count (roughly one chunk per 80 words) and
//! undersized chunks are merged forward until they clear the configured
//! minimum. Every chunk is cleaned and prefixed with a provenance sentence
//! naming its source document; the grounded answer stage relies on that
//! prefix to keep sources apart.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::error::AssistantError;
use crate::providers::EmbeddingProvider;

/// Words per chunk targeted by the breakpoint selector.
const WORDS_PER_CHUNK: usize = 80;

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F\x{80}-\x{9F}]").expect("control char pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// A retrieval unit: cleaned text with provenance baked in, plus the
/// embedding derived from that text. Immutable once inserted into the index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub source: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Splits documents at semantic breakpoints.
#[derive(Clone)]
pub struct SemanticChunker {
    embedder: Arc<dyn EmbeddingProvider>,
    min_chunk_size: usize,
    breakpoint_threshold: f32,
}

impl SemanticChunker {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        min_chunk_size: usize,
        breakpoint_threshold: f32,
    ) -> Self {
        Self {
            embedder,
            min_chunk_size,
            breakpoint_threshold,
        }
    }

    /// Chunks one document, returning embedded, provenance-prefixed chunks.
    ///
    /// Empty or whitespace-only input yields an empty chunk list rather than
    /// an error; a document with nothing to say is not malformed.
    pub async fn chunk_document(
        &self,
        source_name: &str,
        raw_text: &str,
    ) -> Result<Vec<DocumentChunk>, AssistantError> {
        let cleaned = clean_text(raw_text);
        if cleaned.is_empty() {
            return Ok(Vec::new());
        }

        let sentences: Vec<String> = cleaned
            .unicode_sentences()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let word_count = cleaned.unicode_words().count();
        let target_chunks = (word_count / WORDS_PER_CHUNK).max(1);
        debug!(source = source_name, word_count, target_chunks, "chunking document");

        let pieces = if sentences.len() <= 1 || target_chunks == 1 {
            vec![cleaned.clone()]
        } else {
            let embeddings = self.embedder.embed_batch(&sentences).await?;
            let breakpoints =
                select_breakpoints(&embeddings, target_chunks - 1, self.breakpoint_threshold);
            split_at_breakpoints(&sentences, &breakpoints, self.min_chunk_size)
        };

        let texts: Vec<String> = pieces
            .iter()
            .map(|piece| format!("{}{piece}", provenance_prefix(source_name)))
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        Ok(texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| DocumentChunk {
                id: Uuid::new_v4().to_string(),
                source: source_name.to_string(),
                text,
                embedding,
            })
            .collect())
    }
}

/// The provenance sentence prepended to every chunk of `source`.
#[must_use]
pub fn provenance_prefix(source: &str) -> String {
    format!("This data is from the {source} source and the content is: ")
}

/// Strips non-printable characters and collapses runs of whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let stripped = CONTROL_CHARS.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Picks up to `max_breaks` boundary positions from consecutive-sentence
/// distances. A position qualifies when its distance reaches `threshold`
/// times the largest observed distance; of the qualifying positions the
/// largest jumps win.
fn select_breakpoints(embeddings: &[Vec<f32>], max_breaks: usize, threshold: f32) -> Vec<usize> {
    if embeddings.len() < 2 || max_breaks == 0 {
        return Vec::new();
    }

    let distances: Vec<f32> = embeddings
        .windows(2)
        .map(|pair| cosine_distance(&pair[0], &pair[1]))
        .collect();
    let max_distance = distances.iter().cloned().fold(0.0_f32, f32::max);
    if max_distance == 0.0 {
        return Vec::new();
    }
    let cutoff = threshold * max_distance;

    let mut candidates: Vec<(usize, f32)> = distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d >= cutoff)
        .map(|(i, d)| (i, *d))
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates.truncate(max_breaks);

    let mut breaks: Vec<usize> = candidates.into_iter().map(|(i, _)| i + 1).collect();
    breaks.sort_unstable();
    breaks
}

/// Splits `sentences` at the given positions, then merges any piece shorter
/// than `min_chunk_size` characters into its successor (the final piece
/// merges backward).
fn split_at_breakpoints(
    sentences: &[String],
    breakpoints: &[usize],
    min_chunk_size: usize,
) -> Vec<String> {
    let mut pieces = Vec::with_capacity(breakpoints.len() + 1);
    let mut start = 0;
    for &bp in breakpoints {
        pieces.push(sentences[start..bp].join(" "));
        start = bp;
    }
    pieces.push(sentences[start..].join(" "));

    let mut merged: Vec<String> = Vec::with_capacity(pieces.len());
    let mut carry = String::new();
    for piece in pieces {
        let combined = if carry.is_empty() {
            piece
        } else {
            format!("{carry} {piece}")
        };
        if combined.len() < min_chunk_size {
            carry = combined;
        } else {
            merged.push(combined);
            carry = String::new();
        }
    }
    if !carry.is_empty() {
        match merged.last_mut() {
            Some(last) => {
                last.push(' ');
                last.push_str(&carry);
            }
            None => merged.push(carry),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbeddingProvider;

    fn chunker() -> SemanticChunker {
        SemanticChunker::new(Arc::new(MockEmbeddingProvider::new()), 40, 0.5)
    }

    #[test]
    fn clean_text_strips_controls_and_collapses_whitespace() {
        let cleaned = clean_text("  hello\x00\tworld \u{9F}  again\n\n");
        assert_eq!(cleaned, "hello world again");
    }

    #[tokio::test]
    async fn empty_document_yields_no_chunks() {
        let chunks = chunker().chunk_document("brochure", "  \n\t ").await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn every_chunk_carries_provenance_and_embedding() {
        let text = "Palm Hills offers villas. The compound has a gym. \
                    Payment plans reach eight years. Delivery starts next year.";
        let chunks = chunker().chunk_document("palm-hills", text).await.unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.starts_with(&provenance_prefix("palm-hills")));
            assert_eq!(chunk.source, "palm-hills");
            assert!(!chunk.embedding.is_empty());
        }
    }

    #[tokio::test]
    async fn chunk_texts_round_trip_to_cleaned_input() {
        let text = "First sentence here. Second sentence follows! Third one asks? \
                    Fourth sentence closes the paragraph. Fifth adds detail. \
                    Sixth wraps everything up nicely.";
        let prefix = provenance_prefix("doc");
        let chunks = chunker().chunk_document("doc", text).await.unwrap();

        let rebuilt = chunks
            .iter()
            .map(|c| c.text.strip_prefix(&prefix).unwrap())
            .collect::<Vec<_>>()
            .join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rebuilt), normalize(&clean_text(text)));
    }

    #[tokio::test]
    async fn long_document_splits_into_multiple_chunks() {
        let mut text = String::new();
        for i in 0..60 {
            text.push_str(&format!(
                "Sentence number {i} talks about compound amenities and nearby districts \
                 in enough words to matter. "
            ));
        }
        let chunks = chunker().chunk_document("long-doc", &text).await.unwrap();
        assert!(chunks.len() > 1, "expected a split, got {}", chunks.len());
    }

    #[test]
    fn breakpoints_respect_threshold_and_cap() {
        let flat = vec![vec![1.0, 0.0]; 5];
        assert!(select_breakpoints(&flat, 3, 0.5).is_empty());

        let varied = vec![
            vec![1.0, 0.0],
            vec![0.99, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.99],
        ];
        let breaks = select_breakpoints(&varied, 1, 0.5);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0], 2);
    }
}
