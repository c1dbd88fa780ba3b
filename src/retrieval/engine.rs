// Role-aware retrieval engine
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ranking::{self, RankingPolicy};
use crate::documents::{DocumentId, DocumentRegistry, Resolution};
use crate::errors::{RagError, Result};
use crate::index::VectorIndex;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Retrieval tuning levers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages returned when the caller does not ask for a count
    pub default_limit: usize,
    /// Candidates fetched per requested passage before filtering
    pub overfetch_multiplier: usize,
    /// Ordering applied after the access filter
    pub ranking: RankingPolicy,
    /// Upper bound on a single index query
    pub index_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 3,
            overfetch_multiplier: 3,
            ranking: RankingPolicy::DepartmentFirst,
            index_timeout_ms: 5_000,
        }
    }
}

/// A filtered, ranked document handed to answer generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: DocumentId,
    pub content: String,
    pub source: String,
    pub department: String,
    pub similarity: f32,
}

/// Retrieval engine: over-fetch, resolve, filter by role, rank, truncate
pub struct RetrievalEngine {
    registry: Arc<DocumentRegistry>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
    telemetry: TelemetryCollector,
}

impl RetrievalEngine {
    pub fn new(
        registry: Arc<DocumentRegistry>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            registry,
            index,
            config,
            telemetry,
        }
    }

    /// Retrieve with the configured default limit
    pub async fn retrieve_default(&self, query: &str, role: &str) -> Result<Vec<Passage>> {
        self.retrieve(query, role, self.config.default_limit).await
    }

    /// Passages `role` may read, best-first, at most `limit` of them.
    ///
    /// An empty result means nothing accessible matched; it is not an error.
    pub async fn retrieve(&self, query: &str, role: &str, limit: usize) -> Result<Vec<Passage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let fetch = limit.saturating_mul(self.config.overfetch_multiplier);
        let candidates = self.query_index(query, fetch).await?;
        let fetched = candidates.len();

        let ids: Vec<DocumentId> = candidates.iter().map(|c| c.id).collect();
        let resolutions = self.registry.resolve_batch(&ids);
        let policy = self.registry.policy();

        let mut accessible = Vec::with_capacity(candidates.len());
        let mut denied = 0;

        for (candidate, resolution) in candidates.into_iter().zip(resolutions) {
            match resolution {
                Resolution::Committed(record) => {
                    if policy.can_read(role, &record.allowed_roles) {
                        accessible.push(Passage {
                            id: record.id,
                            content: record.content.clone(),
                            source: record.source.clone(),
                            department: record.department.clone(),
                            similarity: candidate.score,
                        });
                    } else {
                        denied += 1;
                    }
                }
                Resolution::Pending => {
                    tracing::debug!(id = %candidate.id, "skipping candidate with registration in flight");
                }
                Resolution::Unknown => {
                    tracing::warn!(id = %candidate.id, "index returned id unknown to registry; dropping");
                    self.telemetry.record(TelemetryEvent::CandidateDropped {
                        id: candidate.id,
                        timestamp: Instant::now(),
                    });
                }
            }
        }

        if denied > 0 {
            self.telemetry.record(TelemetryEvent::AccessDenied {
                role: role.to_string(),
                count: denied,
                timestamp: Instant::now(),
            });
        }

        let ranked = ranking::rank(accessible, self.config.ranking, limit, |dept| {
            policy.is_universal(dept)
        });

        tracing::debug!(
            role,
            candidates = fetched,
            denied,
            returned = ranked.len(),
            "retrieval complete"
        );
        self.telemetry.record(TelemetryEvent::QueryServed {
            role: role.to_string(),
            candidates: fetched,
            returned: ranked.len(),
            timestamp: Instant::now(),
        });

        Ok(ranked)
    }

    async fn query_index(&self, query: &str, count: usize) -> Result<Vec<crate::index::Candidate>> {
        let bound = Duration::from_millis(self.config.index_timeout_ms);
        match tokio::time::timeout(bound, self.index.query(query, count)).await {
            Ok(result) => result,
            Err(_) => Err(RagError::RetrievalTimeout {
                duration_ms: self.config.index_timeout_ms,
            }),
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessPolicy;
    use crate::index::{Candidate, MemoryIndex};
    use async_trait::async_trait;

    struct Fixture {
        engine: RetrievalEngine,
        registry: Arc<DocumentRegistry>,
        telemetry: TelemetryCollector,
    }

    fn fixture_with(index: Arc<dyn VectorIndex>, config: RetrievalConfig) -> Fixture {
        let telemetry = TelemetryCollector::new();
        let registry = Arc::new(DocumentRegistry::new(
            Arc::new(AccessPolicy::default()),
            Arc::clone(&index),
            telemetry.clone(),
        ));
        let engine = RetrievalEngine::new(Arc::clone(&registry), index, config, telemetry.clone());
        Fixture {
            engine,
            registry,
            telemetry,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryIndex::new()), RetrievalConfig::default())
    }

    fn sources(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.source.as_str()).collect()
    }

    /// Index that answers with ids the registry never issued
    struct GhostIndex;

    #[async_trait]
    impl VectorIndex for GhostIndex {
        async fn index(&self, _id: DocumentId, content: &str) -> Result<()> {
            if content == "reject" {
                return Err(RagError::RetrievalUnavailable("rejected".into()));
            }
            Ok(())
        }

        async fn query(&self, _text: &str, count: usize) -> Result<Vec<Candidate>> {
            Ok((0..count as u64)
                .map(|n| Candidate {
                    id: DocumentId::new(n),
                    content: "ghost".to_string(),
                    rank: n as usize,
                    score: 0.5,
                })
                .collect())
        }
    }

    struct SlowIndex;

    #[async_trait]
    impl VectorIndex for SlowIndex {
        async fn index(&self, _id: DocumentId, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _text: &str, _count: usize) -> Result<Vec<Candidate>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    struct DownIndex;

    #[async_trait]
    impl VectorIndex for DownIndex {
        async fn index(&self, _id: DocumentId, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _text: &str, _count: usize) -> Result<Vec<Candidate>> {
            Err(RagError::RetrievalUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_employee_excluded_from_finance() {
        let f = fixture();
        f.registry.register("Q4 revenue $45M", "finance/q4.md", "finance").await.unwrap();
        f.registry.register("Company holidays list", "general/holidays.md", "general").await.unwrap();

        let passages = f.engine.retrieve("revenue", "employee", 3).await.unwrap();
        assert_eq!(sources(&passages), vec!["general/holidays.md"]);
    }

    #[tokio::test]
    async fn test_finance_gets_own_department_first() {
        let f = fixture();
        f.registry.register("Q4 revenue $45M", "finance/q4.md", "finance").await.unwrap();
        f.registry.register("Company holidays list", "general/holidays.md", "general").await.unwrap();

        let passages = f.engine.retrieve("revenue", "finance", 3).await.unwrap();
        assert_eq!(sources(&passages), vec!["finance/q4.md", "general/holidays.md"]);
    }

    #[tokio::test]
    async fn test_privileged_role_bypasses_filter() {
        let f = fixture();
        f.registry.register("Payroll summary", "hr/payroll.md", "hr").await.unwrap();
        f.registry.register("Q4 revenue $45M", "finance/q4.md", "finance").await.unwrap();

        let passages = f.engine.retrieve("revenue", "c-level", 3).await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source, "finance/q4.md");
    }

    #[tokio::test]
    async fn test_poor_match_in_department_beats_close_universal() {
        let f = fixture();
        f.registry.register("revenue revenue revenue", "general/faq.md", "general").await.unwrap();
        f.registry.register("Campaign notes", "marketing/notes.md", "marketing").await.unwrap();

        let passages = f.engine.retrieve("revenue", "marketing", 2).await.unwrap();
        assert_eq!(sources(&passages), vec!["marketing/notes.md", "general/faq.md"]);
    }

    #[tokio::test]
    async fn test_unknown_role_gets_empty_result() {
        let f = fixture();
        f.registry.register("Q4 revenue", "finance/q4.md", "finance").await.unwrap();

        let passages = f.engine.retrieve("revenue", "contractor", 3).await.unwrap();
        assert!(passages.is_empty());
        assert_eq!(f.telemetry.get_stats().empty_results, 1);
        assert_eq!(f.telemetry.get_stats().candidates_denied, 1);
    }

    #[tokio::test]
    async fn test_limit_larger_than_corpus() {
        let f = fixture();
        f.registry.register("a", "hr/a.md", "hr").await.unwrap();
        f.registry.register("b", "general/b.md", "general").await.unwrap();

        let passages = f.engine.retrieve("anything", "hr", 50).await.unwrap();
        assert_eq!(passages.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_skips_index() {
        let f = fixture_with(Arc::new(DownIndex), RetrievalConfig::default());
        assert!(f.engine.retrieve("q", "hr", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_limit_applied() {
        let f = fixture();
        for i in 0..6 {
            f.registry
                .register(&format!("policy {}", i), &format!("hr/{}.md", i), "hr")
                .await
                .unwrap();
        }
        assert_eq!(f.engine.retrieve_default("policy", "hr").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_same_content_twice_distinct_ids() {
        let f = fixture();
        let a = f.registry.register("Travel policy", "general/a.md", "general").await.unwrap();
        let b = f.registry.register("Travel policy", "hr/b.md", "hr").await.unwrap();
        assert_ne!(a, b);

        let hr = f.engine.retrieve("travel", "hr", 3).await.unwrap();
        assert_eq!(hr.len(), 2);

        let employee = f.engine.retrieve("travel", "employee", 3).await.unwrap();
        assert_eq!(employee.len(), 1);
        assert_eq!(employee[0].id, a);
    }

    #[tokio::test]
    async fn test_never_issued_ids_counted_as_drift() {
        let f = fixture_with(Arc::new(GhostIndex), RetrievalConfig::default());
        f.registry.register("x", "hr/x.md", "hr").await.unwrap();

        // id 0 resolves, ids 1 and 2 were never issued
        let passages = f.engine.retrieve("q", "hr", 1).await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(f.telemetry.drift_count(), 2);
    }

    /// Index holding points from an earlier run
    struct StaleIndex;

    #[async_trait]
    impl VectorIndex for StaleIndex {
        async fn index(&self, _id: DocumentId, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _text: &str, _count: usize) -> Result<Vec<Candidate>> {
            Ok((100..103)
                .map(|n| Candidate {
                    id: DocumentId::new(n),
                    content: "stale".to_string(),
                    rank: (n - 100) as usize,
                    score: 0.9,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_stale_points_beyond_issued_ids_are_drift() {
        let f = fixture_with(Arc::new(StaleIndex), RetrievalConfig::default());
        f.registry.register("x", "hr/x.md", "hr").await.unwrap();

        let passages = f.engine.retrieve("q", "hr", 3).await.unwrap();
        assert!(passages.is_empty());
        assert_eq!(f.telemetry.drift_count(), 3);
    }

    #[tokio::test]
    async fn test_unresolvable_candidates_dropped_and_counted() {
        let f = fixture_with(Arc::new(GhostIndex), RetrievalConfig::default());
        assert!(f.registry.register("reject", "hr/r.md", "hr").await.is_err());
        let kept = f.registry.register("x", "hr/x.md", "hr").await.unwrap();

        // id 0 was burned, id 1 resolves, id 2 was never issued
        let passages = f.engine.retrieve("q", "hr", 1).await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].id, kept);
        assert_eq!(f.telemetry.drift_count(), 2);
    }

    #[tokio::test]
    async fn test_index_timeout_surfaces() {
        let config = RetrievalConfig {
            index_timeout_ms: 20,
            ..Default::default()
        };
        let f = fixture_with(Arc::new(SlowIndex), config);
        let err = f.engine.retrieve("q", "hr", 3).await.unwrap_err();
        assert!(matches!(err, RagError::RetrievalTimeout { duration_ms: 20 }));
        assert!(err.is_downstream());
    }

    #[tokio::test]
    async fn test_index_failure_surfaces() {
        let f = fixture_with(Arc::new(DownIndex), RetrievalConfig::default());
        let err = f.engine.retrieve("q", "hr", 3).await.unwrap_err();
        assert!(matches!(err, RagError::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_similarity_ranking_interleaves() {
        let config = RetrievalConfig {
            ranking: RankingPolicy::Similarity,
            ..Default::default()
        };
        let f = fixture_with(Arc::new(MemoryIndex::new()), config);
        f.registry.register("revenue revenue revenue", "general/faq.md", "general").await.unwrap();
        f.registry.register("Campaign notes", "marketing/notes.md", "marketing").await.unwrap();

        let passages = f.engine.retrieve("revenue", "marketing", 2).await.unwrap();
        assert_eq!(sources(&passages), vec!["general/faq.md", "marketing/notes.md"]);
    }

    #[test]
    fn test_retrieval_config_default() {
        let config = RetrievalConfig::default();
        assert_eq!(config.default_limit, 3);
        assert_eq!(config.overfetch_multiplier, 3);
        assert_eq!(config.ranking, RankingPolicy::DepartmentFirst);
    }
}
