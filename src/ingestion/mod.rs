//! Turning raw documents into index-ready chunks.
//!
//! * [`chunker`] — embedding-distance semantic chunking with provenance
//!   prefixes.
//! * [`source`] — the external document-provider seam and the directory
//!   source used at bootstrap, plus parallel batch chunking.

pub mod chunker;
pub mod source;

pub use chunker::{DocumentChunk, SemanticChunker};
pub use source::{DirectorySource, DocumentSource, SourceDocument, chunk_documents};
