//! rolerag - Role-aware retrieval over internal documents
//!
//! Documents are tagged with the roles that may read them when they are
//! registered. Every query is answered only from documents the asking role
//! is allowed to see.
//!
//! # Architecture
//!
//! - **access**: department to role policy and role capabilities
//! - **documents**: registry of ingested documents, directory loader
//! - **index**: vector index seam (in-memory and Qdrant backends)
//! - **retrieval**: role-filtered, department-aware retrieval
//! - **compose**: answer generation seam (Ollama and extractive)
//! - **pipeline**: ingest and ask facade

pub mod access;
pub mod compose;
pub mod config;
pub mod documents;
pub mod errors;
pub mod index;
pub mod pipeline;
pub mod retrieval;
pub mod telemetry;

// Interface layer
pub mod cli;
pub mod repl;

// Re-export commonly used types
pub use access::AccessPolicy;
pub use compose::AnswerComposer;
pub use documents::{DocumentId, DocumentMetadata, DocumentRegistry};
pub use errors::{RagError, Result};
pub use index::{Candidate, VectorIndex};
pub use pipeline::{Answer, Pipeline};
pub use retrieval::{Passage, RetrievalEngine};
