// Prompt assembly for grounded answers
use serde::{Deserialize, Serialize};

use crate::retrieval::Passage;

/// Prompt assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Maximum tokens of passage text placed in the prompt
    pub max_context_tokens: usize,
    /// Instruction placed before the documents
    pub instruction: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 2000,
            instruction: "Based on these company documents, answer the question clearly and concisely."
                .to_string(),
        }
    }
}

/// Builds the document block and full prompt from ranked passages
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PromptConfig) -> Self {
        Self { config }
    }

    /// `[Source i: <source>]` blocks in ranked order.
    ///
    /// Passages past the token budget are left out, except the first,
    /// which is always included.
    pub fn context_text(&self, passages: &[Passage]) -> String {
        let mut text = String::new();
        let mut total_tokens = 0;

        for (idx, passage) in passages.iter().enumerate() {
            // ~4 chars per token
            let tokens = passage.content.len() / 4;
            if idx > 0 && total_tokens + tokens > self.config.max_context_tokens {
                break;
            }
            total_tokens += tokens;
            text.push_str(&format!("\n[Source {}: {}]\n{}\n", idx + 1, passage.source, passage.content));
        }

        text
    }

    pub fn build(&self, question: &str, passages: &[Passage]) -> String {
        format!(
            "{}\n\nDOCUMENTS:\n{}\nQUESTION: {}\n\nANSWER:",
            self.config.instruction,
            self.context_text(passages),
            question
        )
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }
}
