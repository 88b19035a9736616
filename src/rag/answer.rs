//! Context-grounded answer synthesis.

use std::sync::Arc;

use crate::error::AssistantError;
use crate::index::RetrievedChunk;
use crate::language::Lang;
use crate::message::{Message, render_recent};
use crate::prompts;
use crate::providers::CompletionProvider;

const HISTORY_WINDOW: usize = 10;

/// Builds the grounded prompt and makes the single answer call.
///
/// Every retrieved chunk enters the prompt verbatim, provenance prefix
/// included — that prefix is what lets the model keep sources apart, so it
/// is never stripped here. Empty context degrades to an explicit
/// no-context framing instead of an error.
pub struct AnswerStage {
    completion: Arc<dyn CompletionProvider>,
}

impl AnswerStage {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    /// Synthesizes the reply for one turn. No internal retry.
    pub async fn answer(
        &self,
        lang: Lang,
        question: &str,
        refined_question: &str,
        context: &[RetrievedChunk],
        rag_history: &[Message],
    ) -> Result<String, AssistantError> {
        let prompt = self.build_prompt(lang, question, refined_question, context, rag_history);
        self.completion.complete(&prompt).await
    }

    fn build_prompt(
        &self,
        lang: Lang,
        question: &str,
        refined_question: &str,
        context: &[RetrievedChunk],
        rag_history: &[Message],
    ) -> String {
        let context_block = if context.is_empty() {
            prompts::NO_CONTEXT_RETRIEVED.to_string()
        } else {
            context
                .iter()
                .map(|chunk| chunk.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        let history = render_recent(rag_history, HISTORY_WINDOW, prompts::NO_PREVIOUS_HISTORY);
        prompts::grounded_answer(lang, question, refined_question, &context_block, &history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::chunker::provenance_prefix;
    use crate::providers::MockCompletionProvider;

    fn retrieved(source: &str, body: &str) -> RetrievedChunk {
        RetrievedChunk {
            source: source.to_string(),
            text: format!("{}{body}", provenance_prefix(source)),
            distance: 0.1,
        }
    }

    #[test]
    fn prompt_keeps_provenance_prefixes_of_all_sources() {
        let stage = AnswerStage::new(Arc::new(MockCompletionProvider::scripted(["ok"])));
        let context = vec![
            retrieved("palm-hills", "the price list mentions gardens"),
            retrieved("sodic", "the price list mentions marinas"),
        ];
        let prompt = stage.build_prompt(Lang::En, "price?", "refined", &context, &[]);
        assert!(prompt.contains(&provenance_prefix("palm-hills")));
        assert!(prompt.contains(&provenance_prefix("sodic")));
    }

    #[test]
    fn empty_context_uses_degraded_framing() {
        let stage = AnswerStage::new(Arc::new(MockCompletionProvider::scripted(["ok"])));
        let prompt = stage.build_prompt(Lang::En, "q", "", &[], &[]);
        assert!(prompt.contains(prompts::NO_CONTEXT_RETRIEVED));
    }

    #[tokio::test]
    async fn answer_follows_turn_language() {
        let provider = Arc::new(MockCompletionProvider::scripted(["رد"]));
        let stage = AnswerStage::new(provider.clone());
        stage
            .answer(Lang::Ar, "سؤال", "", &[], &[])
            .await
            .unwrap();
        let prompt = provider.prompts().pop().unwrap();
        assert!(prompt.contains("بالعربية"));
    }
}
