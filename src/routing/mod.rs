//! Turn routing: classification, typed adapters, and the conversation
//! router state machine.

pub mod adapter;
pub mod classifier;
pub mod router;

pub use adapter::{TurnInput, TurnOutput, absorb_turn, project_turn};
pub use classifier::{Route, TurnClassifier};
pub use router::{ConversationRouter, FAILURE_REPLY};
