//! Document catalog and bulk loading
//!
//! - Registry: id assignment, metadata storage, forwarding to the index
//! - Loader: reads department folders into ingestible documents

pub mod loader;
pub mod registry;

pub use loader::{infer_department, is_supported, DocumentLoader, SourceDocument};
pub use registry::{DocumentId, DocumentMetadata, DocumentRecord, DocumentRegistry, Resolution};
