// Document registry: the single owner of document ids and metadata
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::access::AccessPolicy;
use crate::errors::{RagError, Result};
use crate::index::VectorIndex;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Stable document identifier, rendered as `doc_<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl DocumentId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc_{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("doc_")
            .and_then(|n| n.parse().ok())
            .map(DocumentId)
            .ok_or_else(|| RagError::Validation(format!("Malformed document id: {}", s)))
    }
}

/// Stored document; immutable once registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub content: String,
    pub source: String,
    pub department: String,
    pub allowed_roles: BTreeSet<String>,
    pub ingested_at: DateTime<Utc>,
}

/// Read-only view of a record without its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: DocumentId,
    pub source: String,
    pub department: String,
    pub allowed_roles: BTreeSet<String>,
    pub ingested_at: DateTime<Utc>,
}

impl From<&DocumentRecord> for DocumentMetadata {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            id: record.id,
            source: record.source.clone(),
            department: record.department.clone(),
            allowed_roles: record.allowed_roles.clone(),
            ingested_at: record.ingested_at,
        }
    }
}

/// Outcome of resolving an index candidate against the registry
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Fully registered: metadata and index entry both present
    Committed(Arc<DocumentRecord>),
    /// Id issued to a registration that has not finished yet
    Pending,
    /// Id the registry never committed (index/registry drift)
    Unknown,
}

#[derive(Default)]
struct Catalog {
    records: HashMap<DocumentId, Arc<DocumentRecord>>,
    /// Every id below this has been settled (committed or burned)
    settled: u64,
}

/// In-memory catalog of ingested documents.
///
/// Registration is serialized through one gate covering id assignment,
/// the index write and the metadata insert. A document becomes visible to
/// readers only once both its index entry and metadata exist.
pub struct DocumentRegistry {
    policy: Arc<AccessPolicy>,
    index: Arc<dyn VectorIndex>,
    next_id: Mutex<u64>,
    /// Every id below this has been handed to a registration
    issued: AtomicU64,
    catalog: RwLock<Catalog>,
    telemetry: TelemetryCollector,
}

impl DocumentRegistry {
    pub fn new(
        policy: Arc<AccessPolicy>,
        index: Arc<dyn VectorIndex>,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            policy,
            index,
            next_id: Mutex::new(0),
            issued: AtomicU64::new(0),
            catalog: RwLock::new(Catalog::default()),
            telemetry,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a document and forward it to the vector index.
    ///
    /// Fails with `InvalidDepartment` before any state changes. If the index
    /// write fails the id is burned and nothing is stored.
    pub async fn register(&self, content: &str, source: &str, department: &str) -> Result<DocumentId> {
        let allowed_roles = self.policy.allowed_roles(department)?;

        let mut next_id = self.next_id.lock().await;
        let id = DocumentId(*next_id);
        *next_id += 1;
        self.issued.store(*next_id, Ordering::Release);

        let indexed = self.index.index(id, content).await;

        let mut catalog = self.write();
        catalog.settled = id.0 + 1;
        if let Err(e) = indexed {
            tracing::warn!(%id, source, error = %e, "index write failed; document not registered");
            return Err(e);
        }

        catalog.records.insert(
            id,
            Arc::new(DocumentRecord {
                id,
                content: content.to_string(),
                source: source.to_string(),
                department: department.to_string(),
                allowed_roles,
                ingested_at: Utc::now(),
            }),
        );
        drop(catalog);
        drop(next_id);

        tracing::info!(%id, source, department, "document registered");
        self.telemetry.record(TelemetryEvent::DocumentRegistered {
            id,
            department: department.to_string(),
            timestamp: Instant::now(),
        });

        Ok(id)
    }

    /// Metadata for a committed document
    pub fn metadata_of(&self, id: DocumentId) -> Result<DocumentMetadata> {
        self.read()
            .records
            .get(&id)
            .map(|record| DocumentMetadata::from(record.as_ref()))
            .ok_or_else(|| RagError::NotFound(id.to_string()))
    }

    /// Full record for a committed document
    pub fn get(&self, id: DocumentId) -> Option<Arc<DocumentRecord>> {
        self.read().records.get(&id).cloned()
    }

    /// Resolve index candidates against one consistent snapshot.
    ///
    /// Only ids issued but not yet settled count as pending; ids beyond the
    /// issued range were never handed out and are drift.
    pub fn resolve_batch(&self, ids: &[DocumentId]) -> Vec<Resolution> {
        let catalog = self.read();
        // issued >= settled always holds once the snapshot is taken
        let issued = self.issued.load(Ordering::Acquire);
        ids.iter()
            .map(|id| match catalog.records.get(id) {
                Some(record) => Resolution::Committed(Arc::clone(record)),
                None if id.0 >= catalog.settled && id.0 < issued => Resolution::Pending,
                None => Resolution::Unknown,
            })
            .collect()
    }

    /// Number of registered documents
    pub fn count(&self) -> usize {
        self.read().records.len()
    }

    /// Documents `role` may read, ordered by id
    pub fn records_for(&self, role: &str) -> Vec<DocumentMetadata> {
        let catalog = self.read();
        let mut visible: Vec<DocumentMetadata> = catalog
            .records
            .values()
            .filter(|record| self.policy.can_read(role, &record.allowed_roles))
            .map(|record| DocumentMetadata::from(record.as_ref()))
            .collect();
        visible.sort_by_key(|m| m.id);
        visible
    }

    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Candidate, MemoryIndex};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    fn registry_with(index: Arc<dyn VectorIndex>) -> DocumentRegistry {
        DocumentRegistry::new(
            Arc::new(AccessPolicy::default()),
            index,
            TelemetryCollector::new(),
        )
    }

    fn registry() -> DocumentRegistry {
        registry_with(Arc::new(MemoryIndex::new()))
    }

    /// Index that rejects writes while `fail` is set
    struct FlakyIndex {
        inner: MemoryIndex,
        fail: AtomicBool,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn index(&self, id: DocumentId, content: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RagError::RetrievalUnavailable("index offline".into()));
            }
            self.inner.index(id, content).await
        }

        async fn query(&self, text: &str, count: usize) -> Result<Vec<Candidate>> {
            self.inner.query(text, count).await
        }
    }

    #[test]
    fn test_document_id_display_and_parse() {
        let id = DocumentId::new(42);
        assert_eq!(id.to_string(), "doc_42");
        assert_eq!("doc_42".parse::<DocumentId>().unwrap(), id);
        assert!("42".parse::<DocumentId>().is_err());
        assert!("doc_x".parse::<DocumentId>().is_err());
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let registry = registry();
        let a = registry.register("Q4 revenue $45M", "finance/q4.md", "finance").await.unwrap();
        let b = registry.register("Company holidays", "general/holidays.md", "general").await.unwrap();
        assert_eq!(a, DocumentId::new(0));
        assert_eq!(b, DocumentId::new(1));
        assert_eq!(registry.count(), 2);
    }

    #[tokio::test]
    async fn test_metadata_resolves_allowed_roles() {
        let registry = registry();
        let id = registry.register("Payroll", "hr/payroll.csv", "hr").await.unwrap();
        let meta = registry.metadata_of(id).unwrap();
        assert_eq!(meta.source, "hr/payroll.csv");
        assert_eq!(meta.department, "hr");
        assert!(meta.allowed_roles.contains("hr"));
        assert!(meta.allowed_roles.contains("c-level"));
        assert!(!meta.allowed_roles.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_of_unknown_id() {
        let registry = registry();
        assert!(matches!(
            registry.metadata_of(DocumentId::new(9)),
            Err(RagError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_department_leaves_registry_unchanged() {
        let index = Arc::new(MemoryIndex::new());
        let registry = registry_with(index.clone());
        let err = registry.register("text", "legal/x.md", "legal").await.unwrap_err();
        assert!(matches!(err, RagError::InvalidDepartment { .. }));
        assert_eq!(registry.count(), 0);
        assert_eq!(index.len().await, 0);

        // No id was consumed by the rejected call
        let id = registry.register("text", "hr/x.md", "hr").await.unwrap();
        assert_eq!(id, DocumentId::new(0));
    }

    #[tokio::test]
    async fn test_index_failure_is_not_partially_registered() {
        let index = Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            fail: AtomicBool::new(true),
        });
        let registry = registry_with(index.clone());

        assert!(registry.register("text", "hr/a.md", "hr").await.is_err());
        assert_eq!(registry.count(), 0);

        index.fail.store(false, Ordering::SeqCst);
        let id = registry.register("text", "hr/b.md", "hr").await.unwrap();
        // Failed registration burned its id
        assert_eq!(id, DocumentId::new(1));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_batch_classifies_ids() {
        let registry = registry();
        let id = registry.register("text", "hr/a.md", "hr").await.unwrap();

        let resolved = registry.resolve_batch(&[id, DocumentId::new(5)]);
        assert!(matches!(resolved[0], Resolution::Committed(_)));
        assert!(matches!(resolved[1], Resolution::Unknown));
    }

    /// Index whose writes wait until the test releases them
    struct GatedIndex {
        inner: MemoryIndex,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl VectorIndex for GatedIndex {
        async fn index(&self, id: DocumentId, content: &str) -> Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.index(id, content).await
        }

        async fn query(&self, text: &str, count: usize) -> Result<Vec<Candidate>> {
            self.inner.query(text, count).await
        }
    }

    #[tokio::test]
    async fn test_in_flight_id_is_pending_and_later_ids_unknown() {
        let index = Arc::new(GatedIndex {
            inner: MemoryIndex::new(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let registry = Arc::new(registry_with(index.clone()));

        let writer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.register("text", "hr/a.md", "hr").await })
        };
        index.entered.notified().await;

        let resolved = registry.resolve_batch(&[DocumentId::new(0), DocumentId::new(1)]);
        assert!(matches!(resolved[0], Resolution::Pending));
        assert!(matches!(resolved[1], Resolution::Unknown));

        index.release.notify_one();
        let id = writer.await.unwrap().unwrap();
        assert!(matches!(registry.resolve_batch(&[id])[0], Resolution::Committed(_)));
    }

    #[tokio::test]
    async fn test_resolve_burned_id_is_unknown() {
        let index = Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            fail: AtomicBool::new(true),
        });
        let registry = registry_with(index);
        let _ = registry.register("text", "hr/a.md", "hr").await;

        let resolved = registry.resolve_batch(&[DocumentId::new(0)]);
        assert!(matches!(resolved[0], Resolution::Unknown));
    }

    #[tokio::test]
    async fn test_records_for_role() {
        let registry = registry();
        registry.register("revenue", "finance/a.md", "finance").await.unwrap();
        registry.register("holidays", "general/b.md", "general").await.unwrap();
        registry.register("campaign", "marketing/c.md", "marketing").await.unwrap();

        let employee = registry.records_for("employee");
        assert_eq!(employee.len(), 1);
        assert_eq!(employee[0].department, "general");

        assert_eq!(registry.records_for("finance").len(), 2);
        assert_eq!(registry.records_for("c-level").len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_registration_unique_ids() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .register(&format!("doc {}", i), &format!("hr/{}.md", i), "hr")
                    .await
                    .unwrap()
            }));
        }

        let mut ids = BTreeSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(registry.count(), 32);
    }
}
