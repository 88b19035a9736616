//! ```text
//! user turn ──► ConversationRouter ──► TurnClassifier ──┐
//!                     │                                 │
//!                     │          ┌──────────────────────┘
//!                     ▼          ▼
//!               project_turn(route)
//!                     │
//!        ┌────────────┴────────────┐
//!        ▼                         ▼
//!  UnitsGenerator            RagPipeline
//!  (external seam)     refine ─► search ─► answer
//!        │                         │
//!        └────────► absorb_turn ◄──┘
//!                     │
//!                     ▼
//!          UserStateStore (per-user lock)
//!
//! documents ──► SemanticChunker ──► DocumentChunk ──► IndexManager
//!                                                    (sqlite-vec file)
//! ```
//!
//! A bilingual real-estate assistant. Each turn is classified and dispatched
//! to one of two subsystems — retrieval-augmented answering over a persisted
//! vector index, or structured search-criteria collection — with a shared
//! history, two subsystem-local histories, and a sticky routing default kept
//! per user. [`assistant::Assistant`] is the facade an API layer talks to.

pub mod assistant;
pub mod config;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod language;
pub mod message;
pub mod prompts;
pub mod providers;
pub mod rag;
pub mod routing;
pub mod state;
pub mod telemetry;
pub mod units;

pub use assistant::{Assistant, RebuildHandle, RebuildStatus};
pub use config::Settings;
pub use error::AssistantError;
pub use language::Lang;
pub use message::Message;
pub use routing::{ConversationRouter, Route};
