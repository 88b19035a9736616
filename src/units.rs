//! The structured-extraction ("Units") subsystem seam.
//!
//! The extraction chain itself — JSON-schema criteria extraction, summary
//! generation, completion checks — lives outside this crate. The router only
//! needs a turn handler that follows the same history contract as the RAG
//! pipeline: append the user message and the reply to both the shared and
//! the local history, and return the updated copies.

use async_trait::async_trait;

use crate::error::AssistantError;
use crate::message::Message;
use crate::routing::{TurnInput, TurnOutput};

/// Handler for turns routed to the criteria-collection subsystem.
#[async_trait]
pub trait UnitsGenerator: Send + Sync {
    /// Runs one extraction turn.
    async fn collect(&self, turn: TurnInput) -> Result<TurnOutput, AssistantError>;
}

/// Replays scripted replies while honoring the history contract.
///
/// Stands in for the real extraction chain in tests and offline runs, the
/// same way the mock providers stand in for the language model.
#[derive(Default)]
pub struct ScriptedUnitsGenerator {
    replies: parking_lot::Mutex<std::collections::VecDeque<String>>,
    fallback: String,
}

impl ScriptedUnitsGenerator {
    /// Creates a generator replaying `replies`, then `fallback` forever.
    pub fn new<I, S>(replies: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: parking_lot::Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: fallback.into(),
        }
    }

    /// Creates a generator that always replies with `reply`.
    pub fn constant(reply: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new(), reply)
    }
}

#[async_trait]
impl UnitsGenerator for ScriptedUnitsGenerator {
    async fn collect(&self, turn: TurnInput) -> Result<TurnOutput, AssistantError> {
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let mut shared_history = turn.shared_history;
        let mut local_history = turn.local_history;
        shared_history.push(Message::user(&turn.user_text));
        local_history.push(Message::user(&turn.user_text));
        shared_history.push(Message::assistant(&reply));
        local_history.push(Message::assistant(&reply));

        Ok(TurnOutput {
            reply,
            shared_history,
            local_history,
        })
    }
}
