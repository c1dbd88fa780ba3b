// Qdrant-backed vector index
use anyhow::Context;
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        point_id::PointIdOptions, value::Kind, vectors_config::Config,
        with_payload_selector::SelectorOptions, CreateCollection, Distance, PointId, PointStruct,
        SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use std::collections::HashMap;
use std::sync::Arc;

use super::{Candidate, Embedder, VectorIndex};
use crate::config::QdrantConfig;
use crate::documents::DocumentId;
use crate::errors::{RagError, Result};

const CONTENT_KEY: &str = "document";

/// Vector index stored in a Qdrant collection.
///
/// Points are keyed by the numeric document id. The collection is recreated
/// on start-up since the registry does not outlive the process.
pub struct QdrantIndex {
    client: QdrantClient,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

fn unavailable(err: anyhow::Error) -> RagError {
    RagError::RetrievalUnavailable(format!("{:#}", err))
}

impl QdrantIndex {
    /// Connect and recreate the configured collection
    pub async fn connect(config: &QdrantConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = QdrantClient::from_url(&config.url)
            .build()
            .context("Failed to create Qdrant client")
            .map_err(unavailable)?;

        let index = Self {
            client,
            collection: config.collection.clone(),
            embedder,
        };
        index.reset_collection(config.dimension).await.map_err(unavailable)?;

        Ok(index)
    }

    async fn reset_collection(&self, dimension: u64) -> anyhow::Result<()> {
        let collections = self.client.list_collections().await?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            self.client
                .delete_collection(&self.collection)
                .await
                .context(format!("Failed to drop stale collection: {}", self.collection))?;
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: dimension,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .context(format!("Failed to create collection: {}", self.collection))?;

        tracing::info!(collection = %self.collection, dimension, "qdrant collection ready");
        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn index(&self, id: DocumentId, content: &str) -> Result<()> {
        let embedding = self.embedder.embed(content).await?;

        let mut payload = HashMap::new();
        payload.insert(CONTENT_KEY.to_string(), QdrantValue::from(content.to_string()));

        let point = PointStruct::new(id.value(), embedding, payload);

        self.client
            .upsert_points_blocking(&self.collection, None, vec![point], None)
            .await
            .context("Failed to upsert point")
            .map_err(unavailable)?;

        Ok(())
    }

    async fn query(&self, text: &str, count: usize) -> Result<Vec<Candidate>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: embedding,
                limit: count as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .context("Failed to search points")
            .map_err(unavailable)?;

        let candidates = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point_id_to_document(&point.id)?;
                let content = point
                    .payload
                    .get(CONTENT_KEY)
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_default();
                Some((id, content, point.score))
            })
            .enumerate()
            .map(|(rank, (id, content, score))| Candidate {
                id,
                content,
                rank,
                score,
            })
            .collect();

        Ok(candidates)
    }
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

fn point_id_to_document(point_id: &Option<PointId>) -> Option<DocumentId> {
    match point_id.as_ref()?.point_id_options.as_ref()? {
        PointIdOptions::Num(n) => Some(DocumentId::new(*n)),
        PointIdOptions::Uuid(u) => {
            tracing::warn!(point = %u, "ignoring non-numeric point id");
            None
        }
    }
}
