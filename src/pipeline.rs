// End-to-end pipeline: ingest documents, answer role-scoped questions
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::access::AccessPolicy;
use crate::compose::AnswerComposer;
use crate::documents::{
    infer_department, is_supported, DocumentId, DocumentLoader, DocumentMetadata,
    DocumentRegistry, SourceDocument,
};
use crate::errors::{RagError, Result};
use crate::index::VectorIndex;
use crate::retrieval::{Passage, RetrievalConfig, RetrievalEngine};
use crate::telemetry::TelemetryCollector;

/// Answer to a role-scoped question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Source labels in passage order
    pub sources: Vec<String>,
    pub role: String,
    pub query: String,
}

/// Fixed reply when nothing accessible matched
pub fn no_access_message(role: &str) -> String {
    format!("No documents found accessible to {} role for this query.", role)
}

/// Top-level facade over registry, retrieval and answer composition
pub struct Pipeline {
    registry: Arc<DocumentRegistry>,
    engine: RetrievalEngine,
    composer: Arc<dyn AnswerComposer>,
    telemetry: TelemetryCollector,
}

impl Pipeline {
    pub fn new(
        policy: AccessPolicy,
        index: Arc<dyn VectorIndex>,
        composer: Arc<dyn AnswerComposer>,
        config: RetrievalConfig,
    ) -> Self {
        let telemetry = TelemetryCollector::new();
        let registry = Arc::new(DocumentRegistry::new(
            Arc::new(policy),
            Arc::clone(&index),
            telemetry.clone(),
        ));
        let engine = RetrievalEngine::new(Arc::clone(&registry), index, config, telemetry.clone());

        Self {
            registry,
            engine,
            composer,
            telemetry,
        }
    }

    /// Bulk load every document the loader finds; returns the number registered
    pub async fn load_all(&self, loader: &DocumentLoader) -> Result<usize> {
        self.load_all_with(loader, |_, _| {}).await
    }

    /// Bulk load, calling `on_loaded(doc, total)` after each registration
    pub async fn load_all_with<F>(&self, loader: &DocumentLoader, mut on_loaded: F) -> Result<usize>
    where
        F: FnMut(&SourceDocument, usize),
    {
        let documents = loader.load_all(self.registry.policy())?;
        let total = documents.len();
        for doc in &documents {
            self.register_source(doc).await?;
            on_loaded(doc, total);
        }
        Ok(total)
    }

    /// Register one loaded document. Same path as `ingest` minus the
    /// caller-facing error translation.
    pub async fn register_source(&self, doc: &SourceDocument) -> Result<DocumentId> {
        self.registry
            .register(&doc.content, &doc.source, &doc.department)
            .await
    }

    /// Add a document at runtime
    pub async fn ingest(&self, content: &str, source: &str, department: &str) -> Result<DocumentId> {
        self.registry
            .register(content, source, department)
            .await
            .map_err(|e| match e {
                RagError::InvalidDepartment { .. } => RagError::Validation(e.to_string()),
                other => other,
            })
    }

    /// Upload path: checks the uploader's capability and the file type, and
    /// infers the department from `source` when none is given.
    pub async fn ingest_as(
        &self,
        uploader_role: &str,
        content: &str,
        source: &str,
        department: Option<&str>,
    ) -> Result<DocumentId> {
        if !self.registry.policy().can_ingest(uploader_role) {
            return Err(RagError::Forbidden {
                role: uploader_role.to_string(),
                action: "upload documents".to_string(),
            });
        }

        if !is_supported(source) {
            return Err(RagError::Validation(format!(
                "Unsupported file format: {}. Supported: md, csv, txt",
                source
            )));
        }

        if content.trim().is_empty() {
            return Err(RagError::Validation(format!("{} has no text content", source)));
        }

        let department = match department {
            Some(dept) => dept,
            None => infer_department(source).ok_or_else(|| {
                RagError::Validation(format!(
                    "Could not infer department from filename '{}'. Please specify one of: {}",
                    source,
                    self.registry.policy().departments().collect::<Vec<_>>().join(", ")
                ))
            })?,
        };

        let id = self.ingest(content, source, department).await?;
        tracing::info!(%id, uploader = uploader_role, source, department, "document uploaded");
        Ok(id)
    }

    /// Answer `question` using only documents `role` may read
    pub async fn ask(&self, question: &str, role: &str) -> Result<Answer> {
        let passages = self.engine.retrieve_default(question, role).await?;
        self.answer_from(question, role, passages).await
    }

    /// Like `ask`, drawing on at most `limit` passages
    pub async fn ask_with_limit(&self, question: &str, role: &str, limit: usize) -> Result<Answer> {
        let passages = self.engine.retrieve(question, role, limit).await?;
        self.answer_from(question, role, passages).await
    }

    async fn answer_from(&self, question: &str, role: &str, passages: Vec<Passage>) -> Result<Answer> {
        if passages.is_empty() {
            return Ok(Answer {
                answer: no_access_message(role),
                sources: Vec::new(),
                role: role.to_string(),
                query: question.to_string(),
            });
        }

        let answer = self.composer.compose(question, &passages).await?;

        Ok(Answer {
            answer,
            sources: passages.into_iter().map(|p| p.source).collect(),
            role: role.to_string(),
            query: question.to_string(),
        })
    }

    /// Read-only retrieval introspection
    pub async fn retrieve(&self, query: &str, role: &str, limit: usize) -> Result<Vec<Passage>> {
        self.engine.retrieve(query, role, limit).await
    }

    pub fn metadata_of(&self, id: DocumentId) -> Result<DocumentMetadata> {
        self.registry.metadata_of(id)
    }

    /// Documents `role` may read, ordered by id
    pub fn documents_for(&self, role: &str) -> Vec<DocumentMetadata> {
        self.registry.records_for(role)
    }

    pub fn document_count(&self) -> usize {
        self.registry.count()
    }

    pub fn policy(&self) -> &AccessPolicy {
        self.registry.policy()
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }
}
