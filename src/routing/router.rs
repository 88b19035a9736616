//! The top-level conversation state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AssistantError;
use crate::language::Lang;
use crate::message::Message;
use crate::rag::RagPipeline;
use crate::state::{ConversationState, UserStateStore};
use crate::units::UnitsGenerator;

use super::adapter::{absorb_turn, project_turn};
use super::classifier::{Route, TurnClassifier};

/// The one user-visible failure string. Produced only here — no stage below
/// the router fabricates apology text.
pub const FAILURE_REPLY: &str = "Sorry, I couldn't process your request.";

/// Routes each turn to a subsystem and owns all state mutation.
///
/// A turn moves through classifying → dispatching(route) → done, and always
/// reaches done: every internal failure (classification, dispatch, timeout)
/// collapses into [`FAILURE_REPLY`] rather than a stuck conversation. The
/// per-user lock is held from state load to write-back, so the three
/// histories and the sticky route commit atomically with respect to other
/// turns of the same user.
pub struct ConversationRouter {
    classifier: TurnClassifier,
    rag: RagPipeline,
    units: Arc<dyn UnitsGenerator>,
    store: UserStateStore,
    call_timeout: Duration,
}

impl ConversationRouter {
    pub fn new(
        classifier: TurnClassifier,
        rag: RagPipeline,
        units: Arc<dyn UnitsGenerator>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            rag,
            units,
            store: UserStateStore::new(),
            call_timeout,
        }
    }

    /// Handles one turn for `user_id` and returns the reply text.
    ///
    /// `seed_history` hydrates the shared history for users arriving with an
    /// existing transcript; an explicitly empty seed instead deletes all
    /// three stored histories before the turn runs.
    pub async fn handle_turn(
        &self,
        user_id: &str,
        user_text: &str,
        seed_history: Option<Vec<Message>>,
    ) -> String {
        let mut state = self.store.acquire(user_id).await;

        match seed_history {
            Some(seed) if seed.is_empty() => {
                info!(user_id, "empty seed history; resetting conversation state");
                state.reset();
            }
            Some(seed) if state.shared_history.is_empty() => {
                state.shared_history = seed;
            }
            _ => {}
        }

        match self.run_turn(&mut state, user_text).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                warn!(user_id, "subsystem produced an empty reply");
                FAILURE_REPLY.to_string()
            }
            Err(err) => {
                warn!(user_id, error = %err, "turn failed");
                FAILURE_REPLY.to_string()
            }
        }
    }

    async fn run_turn(
        &self,
        state: &mut ConversationState,
        user_text: &str,
    ) -> Result<String, AssistantError> {
        let lang = Lang::detect(user_text);

        let route = self
            .with_deadline(self.classifier.classify(
                &state.shared_history,
                user_text,
                state.last_route,
            ))
            .await?;
        info!(route = route.token(), lang = lang.tag(), "turn dispatched");

        let input = project_turn(state, route, user_text, lang);
        let output = match route {
            Route::Units => self.with_deadline(self.units.collect(input)).await?,
            Route::Rag => self.with_deadline(self.rag.handle(input)).await?,
        };

        let reply = output.reply.clone();
        absorb_turn(state, route, output);
        Ok(reply)
    }

    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, AssistantError>>,
    ) -> Result<T, AssistantError> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| AssistantError::Timeout(self.call_timeout))?
    }

    /// Copies a user's current state, mainly for introspection and tests.
    pub async fn state_snapshot(&self, user_id: &str) -> Option<ConversationState> {
        self.store.snapshot(user_id).await
    }
}
