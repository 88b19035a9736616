//! Sequencing of the RAG stages for one turn.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AssistantError;
use crate::index::IndexManager;
use crate::message::Message;
use crate::providers::CompletionProvider;
use crate::routing::{TurnInput, TurnOutput};

use super::answer::AnswerStage;
use super::refine::QueryRefiner;

/// Owns the refine → search → answer sequence and the RAG-side history
/// bookkeeping: exactly one user append and one assistant append per turn on
/// each of the two history lists it receives.
pub struct RagPipeline {
    refiner: QueryRefiner,
    answer: AnswerStage,
    index: Arc<IndexManager>,
    retrieval_k: usize,
}

impl RagPipeline {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        index: Arc<IndexManager>,
        retrieval_k: usize,
    ) -> Self {
        Self {
            refiner: QueryRefiner::new(completion.clone()),
            answer: AnswerStage::new(completion),
            index,
            retrieval_k,
        }
    }

    /// Runs one RAG turn.
    ///
    /// With no live index the pipeline short-circuits: refinement is skipped
    /// entirely and the answer stage runs with empty context. A query that
    /// lands inside a rebuild's delete-recreate window takes the same
    /// degraded path.
    pub async fn handle(&self, turn: TurnInput) -> Result<TurnOutput, AssistantError> {
        let TurnInput {
            lang,
            user_text,
            mut shared_history,
            local_history: mut rag_history,
        } = turn;

        rag_history.push(Message::user(&user_text));
        shared_history.push(Message::user(&user_text));

        let (refined_query, context) = if self.index.is_loaded().await {
            let refined = self.refiner.refine(&rag_history, &user_text).await?;
            let hits = self.index.search(&refined, self.retrieval_k).await?;
            debug!(hits = hits.len(), "context retrieved");
            (refined, hits)
        } else {
            info!("no index loaded; answering with empty context");
            (String::new(), Vec::new())
        };

        let reply = self
            .answer
            .answer(lang, &user_text, &refined_query, &context, &rag_history)
            .await?;

        rag_history.push(Message::assistant(&reply));
        shared_history.push(Message::assistant(&reply));

        Ok(TurnOutput {
            reply,
            shared_history,
            local_history: rag_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Lang;
    use crate::providers::{MockCompletionProvider, MockEmbeddingProvider};
    use tempfile::tempdir;

    fn turn(text: &str) -> TurnInput {
        TurnInput {
            lang: Lang::detect(text),
            user_text: text.to_string(),
            shared_history: Vec::new(),
            local_history: Vec::new(),
        }
    }

    fn absent_index() -> Arc<IndexManager> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never-created.sqlite");
        // Keep the tempdir alive for the test process; leaking in tests is fine.
        std::mem::forget(dir);
        Arc::new(IndexManager::new(
            path,
            Arc::new(MockEmbeddingProvider::with_dimensions(4)),
        ))
    }

    #[tokio::test]
    async fn absent_index_skips_refinement() {
        let completion = Arc::new(MockCompletionProvider::scripted([
            "There is no relevant information available, but generally...",
        ]));
        let pipeline = RagPipeline::new(completion.clone(), absent_index(), 10);

        let output = pipeline.handle(turn("what about mortgages?")).await.unwrap();
        assert!(!output.reply.is_empty());
        // Only the answer stage called the model; refinement was skipped.
        assert_eq!(completion.prompts().len(), 1);
        assert!(completion.prompts()[0].contains("No context was retrieved."));
    }

    #[tokio::test]
    async fn histories_grow_by_exactly_one_user_and_one_assistant_message() {
        let completion = Arc::new(MockCompletionProvider::scripted(["the answer"]));
        let pipeline = RagPipeline::new(completion, absent_index(), 10);

        let mut input = turn("second question");
        input.shared_history.push(Message::user("first question"));
        input.shared_history.push(Message::assistant("first answer"));

        let output = pipeline.handle(input).await.unwrap();
        assert_eq!(output.shared_history.len(), 4);
        assert_eq!(output.local_history.len(), 2);
        assert_eq!(output.local_history[0].content, "second question");
        assert_eq!(output.local_history[1].content, "the answer");
    }

    #[tokio::test]
    async fn refinement_failure_fails_the_turn() {
        let dir = tempdir().unwrap();
        let index = Arc::new(IndexManager::new(
            dir.path().join("idx.sqlite"),
            Arc::new(MockEmbeddingProvider::with_dimensions(4)),
        ));
        index
            .create(&[crate::ingestion::DocumentChunk {
                id: "c1".into(),
                source: "doc".into(),
                text: "some text".into(),
                embedding: vec![1.0, 0.0, 0.0, 0.0],
            }])
            .await
            .unwrap();

        let pipeline = RagPipeline::new(Arc::new(MockCompletionProvider::failing()), index, 10);
        let err = pipeline.handle(turn("question")).await.unwrap_err();
        assert!(matches!(err, AssistantError::Completion(_)));
    }
}
