//! Similarity search boundary
//!
//! The retrieval core talks to its vector store only through
//! [`VectorIndex`]. Two backends ship with the crate:
//! - [`MemoryIndex`]: in-process lexical cosine index
//! - [`QdrantIndex`]: Qdrant collection fed by an [`Embedder`]

pub mod embedding;
pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::documents::DocumentId;
use crate::errors::Result;

pub use embedding::{Embedder, OllamaEmbedder};
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

/// One similarity-search hit, before access filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: DocumentId,
    pub content: String,
    /// Position in the best-first result list, starting at 0
    pub rank: usize,
    /// Backend-specific similarity, higher is closer
    pub score: f32,
}

/// Vector store contract consumed by the registry and retrieval engine.
///
/// Implementations report failures as `RagError::RetrievalUnavailable`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store content for later search; called once per document
    async fn index(&self, id: DocumentId, content: &str) -> Result<()>;

    /// Up to `count` candidates ordered best-first
    async fn query(&self, text: &str, count: usize) -> Result<Vec<Candidate>>;
}
