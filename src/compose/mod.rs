//! Answer generation boundary
//!
//! - Prompt: formats ranked passages into a grounded prompt
//! - Ollama: composer backed by `POST /api/generate`
//! - Extractive: offline composer that returns the passages themselves

pub mod extractive;
pub mod ollama;
pub mod prompt;

use async_trait::async_trait;

use crate::errors::Result;
use crate::retrieval::Passage;

pub use extractive::ExtractiveComposer;
pub use ollama::OllamaComposer;
pub use prompt::{PromptBuilder, PromptConfig};

/// Turns a question plus ordered passages into prose.
///
/// Callers never pass an empty passage list. Failures are reported as
/// `RagError::GenerationFailed`.
#[async_trait]
pub trait AnswerComposer: Send + Sync {
    async fn compose(&self, question: &str, passages: &[Passage]) -> Result<String>;
}
