//! Per-turn routing classification with sticky fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssistantError;
use crate::message::{Message, render_recent};
use crate::prompts;
use crate::providers::CompletionProvider;

/// Shared-history messages shown to the classifier.
const HISTORY_WINDOW: usize = 4;

/// Which subsystem owns a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Structured criteria collection.
    Units,
    /// Retrieval-augmented answering.
    Rag,
}

impl Route {
    /// The literal token the classifier model must emit for this route.
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Route::Units => "UNITS",
            Route::Rag => "RAG",
        }
    }

    /// Parses a raw model response; `None` for anything that is not exactly
    /// one of the two tokens.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "UNITS" => Some(Route::Units),
            "RAG" => Some(Route::Rag),
            _ => None,
        }
    }
}

/// Decides which subsystem owns the current turn.
///
/// A pure function from (bounded history, latest message, previous route) to
/// a two-valued decision, apart from the single completion call. Output that
/// is neither valid token keeps the previous route — the sticky fallback
/// that stops ambiguous model output from flapping the conversation between
/// subsystems. With no previous route the fallback is [`Route::Units`].
pub struct TurnClassifier {
    completion: Arc<dyn CompletionProvider>,
}

impl TurnClassifier {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    /// Classifies one turn.
    pub async fn classify(
        &self,
        shared_history: &[Message],
        latest_message: &str,
        previous_route: Option<Route>,
    ) -> Result<Route, AssistantError> {
        let fallback = previous_route.unwrap_or(Route::Units);
        let history = render_recent(
            shared_history,
            HISTORY_WINDOW,
            prompts::START_OF_CONVERSATION,
        );
        let prompt = prompts::classifier(&history, latest_message, fallback.token());
        let raw = self.completion.complete(&prompt).await?;

        let route = Route::parse(&raw).unwrap_or(fallback);
        debug!(raw = %raw.trim(), route = route.token(), "turn classified");
        Ok(route)
    }
}
