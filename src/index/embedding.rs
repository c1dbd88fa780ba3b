//! Text embedding for vector-store backends
//!
//! `OllamaEmbedder` calls `POST /api/embeddings` on a local Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{RagError, Result};

/// Produces a dense vector for a piece of text
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by an Ollama embedding model
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("Failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::RetrievalUnavailable(format!(
                "Ollama embeddings error: HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("Failed to parse embedding: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(RagError::RetrievalUnavailable(format!(
                "Model '{}' returned an empty embedding",
                self.model
            )));
        }

        Ok(body.embedding)
    }
}
