//! Error types for rolerag
//!
//! Library operations return [`RagError`]; the binary wraps them in
//! `anyhow` at the edge.

use thiserror::Error;

/// Main error type for the retrieval core
#[derive(Error, Debug)]
pub enum RagError {
    /// Department tag not known to the access policy
    #[error("Invalid department: {department}. Valid departments: {}", known.join(", "))]
    InvalidDepartment {
        department: String,
        known: Vec<String>,
    },

    /// Registry lookup by id failed
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Caller-facing validation failure (bad department, unsupported upload)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Role lacks the capability required for an action
    #[error("Role '{role}' is not permitted to {action}")]
    Forbidden { role: String, action: String },

    /// Vector index unreachable or erroring
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Vector index did not answer within the configured bound
    #[error("Retrieval timed out after {duration_ms}ms")]
    RetrievalTimeout { duration_ms: u64 },

    /// Answer generation failed downstream
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Bulk load found nothing to ingest
    #[error("No documents loaded from {0}")]
    EmptyCorpus(String),

    /// Access policy violates its invariants
    #[error("Access policy error: {0}")]
    PolicyError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RagError {
    /// True for failures of the external index or answer generator.
    pub fn is_downstream(&self) -> bool {
        matches!(
            self,
            RagError::RetrievalUnavailable(_)
                | RagError::RetrievalTimeout { .. }
                | RagError::GenerationFailed(_)
        )
    }
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, RagError>;
