//! Typed projection between router state and subsystem turns.
//!
//! Subsystems never see [`ConversationState`]; they get a [`TurnInput`]
//! holding the user text, the shared history, and their own local history,
//! and hand back a [`TurnOutput`] with the updated copies. The router
//! absorbs the output under the per-user lock, which gives each turn
//! single-writer semantics over the shared history — only the dispatched
//! subsystem extends it.

use crate::language::Lang;
use crate::message::Message;
use crate::state::ConversationState;

use super::classifier::Route;

/// Everything a subsystem receives for one turn.
#[derive(Clone, Debug)]
pub struct TurnInput {
    /// Reply language detected for this turn.
    pub lang: Lang,
    /// The user's latest message, not yet appended to any history.
    pub user_text: String,
    /// The shared history both subsystems read and extend.
    pub shared_history: Vec<Message>,
    /// The dispatched subsystem's own history.
    pub local_history: Vec<Message>,
}

/// Everything a subsystem hands back.
#[derive(Clone, Debug)]
pub struct TurnOutput {
    /// The reply shown to the user.
    pub reply: String,
    /// Shared history including this turn's user and assistant messages.
    pub shared_history: Vec<Message>,
    /// Local history including this turn's user and assistant messages.
    pub local_history: Vec<Message>,
}

/// Projects the state into the chosen subsystem's turn input.
#[must_use]
pub fn project_turn(
    state: &ConversationState,
    route: Route,
    user_text: &str,
    lang: Lang,
) -> TurnInput {
    let local_history = match route {
        Route::Units => state.units_history.clone(),
        Route::Rag => state.rag_history.clone(),
    };
    TurnInput {
        lang,
        user_text: user_text.to_string(),
        shared_history: state.shared_history.clone(),
        local_history,
    }
}

/// Writes a subsystem's output back into the state, along with the route
/// that produced it.
pub fn absorb_turn(state: &mut ConversationState, route: Route, output: TurnOutput) {
    state.shared_history = output.shared_history;
    match route {
        Route::Units => state.units_history = output.local_history,
        Route::Rag => state.rag_history = output.local_history,
    }
    state.last_route = Some(route);
}
