//! The retrieval-augmented answer path.
//!
//! A strict two-step pipeline with one short-circuit:
//!
//! ```text
//! question ──► refine (history-aware, always English)
//!                  │
//!                  ▼
//!           similarity_search ──► grounded answer
//!
//! no index ──────────────────────► grounded answer (empty context)
//! ```
//!
//! [`QueryRefiner`] and [`AnswerStage`] each make exactly one completion
//! call and never retry; retry and timeout policy belong to the router.

pub mod answer;
pub mod pipeline;
pub mod refine;

pub use answer::AnswerStage;
pub use pipeline::RagPipeline;
pub use refine::QueryRefiner;
