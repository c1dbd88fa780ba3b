// Offline composer: answers with the retrieved passages verbatim
use async_trait::async_trait;

use super::{AnswerComposer, PromptBuilder};
use crate::errors::Result;
use crate::retrieval::Passage;

/// Returns the ranked passages with their source labels, no model involved
#[derive(Debug, Clone, Default)]
pub struct ExtractiveComposer {
    prompt: PromptBuilder,
}

impl ExtractiveComposer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnswerComposer for ExtractiveComposer {
    async fn compose(&self, _question: &str, passages: &[Passage]) -> Result<String> {
        Ok(format!(
            "Relevant excerpts ({} document{}):\n{}",
            passages.len(),
            if passages.len() == 1 { "" } else { "s" },
            self.prompt.context_text(passages)
        ))
    }
}
