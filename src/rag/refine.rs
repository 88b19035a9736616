//! Query refinement against conversation history.

use std::sync::Arc;

use tracing::debug;

use crate::error::AssistantError;
use crate::message::{Message, render_recent};
use crate::prompts;
use crate::providers::CompletionProvider;

/// Messages of RAG history considered when refining.
const HISTORY_WINDOW: usize = 10;

/// Rewrites the latest question into one self-contained retrieval query.
///
/// Refinement decouples retrieval language from reply language: whatever the
/// user writes, the refined query is English, scoped to real estate, and has
/// its anaphora resolved against recent history. A failed completion call is
/// a hard failure — silently retrieving with the raw question would degrade
/// answer quality without any signal.
pub struct QueryRefiner {
    completion: Arc<dyn CompletionProvider>,
}

impl QueryRefiner {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    /// Produces the refined retrieval query.
    pub async fn refine(
        &self,
        rag_history: &[Message],
        question: &str,
    ) -> Result<String, AssistantError> {
        let history = render_recent(rag_history, HISTORY_WINDOW, prompts::NO_PREVIOUS_HISTORY);
        let prompt = prompts::refinement(&history, question);
        let refined = self.completion.complete(&prompt).await?;
        let refined = refined.trim().to_string();
        if refined.is_empty() {
            return Err(AssistantError::Completion(
                "refinement returned an empty query".into(),
            ));
        }
        debug!(refined = %refined, "query refined");
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockCompletionProvider;

    #[tokio::test]
    async fn refine_returns_trimmed_model_output() {
        let provider = Arc::new(MockCompletionProvider::scripted([
            "  payment plans for Palm Hills villas \n",
        ]));
        let refiner = QueryRefiner::new(provider);
        let refined = refiner.refine(&[], "and the payment plans?").await.unwrap();
        assert_eq!(refined, "payment plans for Palm Hills villas");
    }

    #[tokio::test]
    async fn provider_failure_is_a_hard_failure() {
        let refiner = QueryRefiner::new(Arc::new(MockCompletionProvider::failing()));
        let err = refiner.refine(&[], "anything").await.unwrap_err();
        assert!(matches!(err, AssistantError::Completion(_)));
    }

    #[tokio::test]
    async fn history_window_is_bounded() {
        let provider = Arc::new(MockCompletionProvider::scripted(["q"]));
        let refiner = QueryRefiner::new(provider.clone());
        let history: Vec<Message> = (0..15)
            .map(|i| Message::user(&format!("message {i}")))
            .collect();
        refiner.refine(&history, "latest").await.unwrap();

        let prompt = provider.prompts().pop().unwrap();
        assert!(!prompt.contains("message 4"));
        assert!(prompt.contains("message 5"));
        assert!(prompt.contains("message 14"));
    }
}
