//! Per-user conversational state and its store.
//!
//! [`ConversationState`] is the aggregate root: three append-only histories
//! plus the sticky routing decision. The conversation router exclusively
//! owns mutation — subsystems receive projected copies and hand back updated
//! histories by value.
//!
//! [`UserStateStore`] enforces per-user serialization: acquiring a user's
//! state yields an owned async lock guard held across the whole turn, so two
//! turns for the same user can never interleave their read-modify-write
//! (the lost-update race a naive get-then-put store would allow). Distinct
//! users proceed fully in parallel.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::message::Message;
use crate::routing::Route;

/// Everything the assistant remembers about one user.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// History visible to both subsystems and the classifier.
    pub shared_history: Vec<Message>,
    /// RAG-subsystem-local history.
    pub rag_history: Vec<Message>,
    /// Extraction-subsystem-local history.
    pub units_history: Vec<Message>,
    /// Sticky default for ambiguous classifications.
    pub last_route: Option<Route>,
}

impl ConversationState {
    /// Drops all three histories and the sticky route.
    pub fn reset(&mut self) {
        self.shared_history.clear();
        self.rag_history.clear();
        self.units_history.clear();
        self.last_route = None;
    }

    /// True when no history has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared_history.is_empty()
            && self.rag_history.is_empty()
            && self.units_history.is_empty()
    }
}

/// Keyed store of conversation states with per-user locking.
#[derive(Default)]
pub struct UserStateStore {
    users: Mutex<FxHashMap<String, Arc<AsyncMutex<ConversationState>>>>,
}

impl UserStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock on one user's state, creating it on first contact.
    ///
    /// The returned guard keeps every other turn for the same user queued
    /// until it is dropped; hold it across the full read-modify-write.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<ConversationState> {
        let entry = {
            let mut users = self.users.lock();
            users
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationState::default())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Copies a user's current state without holding the lock afterwards.
    pub async fn snapshot(&self, user_id: &str) -> Option<ConversationState> {
        let entry = {
            let users = self.users.lock();
            users.get(user_id).cloned()
        };
        match entry {
            Some(entry) => Some(entry.lock().await.clone()),
            None => None,
        }
    }
}
