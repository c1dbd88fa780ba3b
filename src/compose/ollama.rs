//! Ollama answer composer
//!
//! Sends the assembled prompt to `POST /api/generate` with streaming
//! disabled and returns the `response` field.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AnswerComposer, PromptBuilder};
use crate::errors::{RagError, Result};
use crate::retrieval::Passage;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Composer backed by a local Ollama model
#[derive(Debug, Clone)]
pub struct OllamaComposer {
    client: Client,
    base_url: String,
    model: String,
    prompt: PromptBuilder,
    max_tokens: u32,
}

impl OllamaComposer {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompt: PromptBuilder::new(),
            max_tokens: 500,
        })
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl AnswerComposer for OllamaComposer {
    async fn compose(&self, question: &str, passages: &[Passage]) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt: self.prompt.build(question, passages),
            stream: false,
            options: GenerateOptions {
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::GenerationFailed(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::GenerationFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationFailed(format!("Failed to parse response: {}", e)))?;

        Ok(body.response.trim().to_string())
    }
}
