//! Property tests for role-scoped retrieval
//!
//! Corpora and queries are generated by quickcheck; each case builds a fresh
//! in-memory pipeline and drives it with `tokio_test::block_on`.

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use std::collections::BTreeSet;
use std::sync::Arc;

use rolerag::{
    access::AccessPolicy,
    compose::ExtractiveComposer,
    index::MemoryIndex,
    pipeline::no_access_message,
    retrieval::{RankingPolicy, RetrievalConfig},
    DocumentId, Pipeline,
};

const DEPARTMENTS: &[&str] = &["finance", "marketing", "hr", "engineering", "general"];
const WORDS: &[&str] = &["revenue", "campaign", "leave", "deploy", "holiday", "policy", "budget"];
const ROLES: &[&str] = &["finance", "marketing", "hr", "engineering", "employee"];

#[derive(Debug, Clone)]
struct Doc {
    department: &'static str,
    words: Vec<&'static str>,
}

impl Arbitrary for Doc {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 4 + 1;
        Doc {
            department: g.choose(DEPARTMENTS).copied().unwrap_or("general"),
            words: (0..len)
                .map(|_| g.choose(WORDS).copied().unwrap_or("policy"))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Query(String);

impl Arbitrary for Query {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 3 + 1;
        let words: Vec<&str> = (0..len)
            .map(|_| g.choose(WORDS).copied().unwrap_or("policy"))
            .collect();
        Query(words.join(" "))
    }
}

fn build(docs: &[Doc], ranking: RankingPolicy) -> Pipeline {
    let pipeline = Pipeline::new(
        AccessPolicy::default(),
        Arc::new(MemoryIndex::new()),
        Arc::new(ExtractiveComposer::new()),
        RetrievalConfig {
            ranking,
            ..RetrievalConfig::default()
        },
    );
    tokio_test::block_on(async {
        for (i, doc) in docs.iter().enumerate() {
            pipeline
                .ingest(
                    &doc.words.join(" "),
                    &format!("{}/{}.md", doc.department, i),
                    doc.department,
                )
                .await
                .unwrap();
        }
    });
    pipeline
}

fn retrieved(pipeline: &Pipeline, query: &str, role: &str, limit: usize) -> BTreeSet<DocumentId> {
    tokio_test::block_on(pipeline.retrieve(query, role, limit))
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect()
}

#[quickcheck]
fn prop_department_isolation(docs: Vec<Doc>, query: Query, limit: u8) -> bool {
    let pipeline = build(&docs, RankingPolicy::DepartmentFirst);
    let policy = pipeline.policy();
    let limit = limit as usize % 6;

    ROLES.iter().all(|role| {
        let allowed = policy.departments_for(role);
        tokio_test::block_on(pipeline.retrieve(&query.0, role, limit))
            .unwrap()
            .iter()
            .all(|p| allowed.contains(&p.department.as_str()))
    })
}

#[quickcheck]
fn prop_never_more_than_limit(docs: Vec<Doc>, query: Query, limit: u8) -> bool {
    let pipeline = build(&docs, RankingPolicy::DepartmentFirst);
    let limit = limit as usize % 6;

    ROLES
        .iter()
        .chain(std::iter::once(&"c-level"))
        .all(|role| tokio_test::block_on(pipeline.retrieve(&query.0, role, limit)).unwrap().len() <= limit)
}

/// employee reads only the universal department, a subset of every other role's
fn monotone_under(docs: &[Doc], query: &Query, ranking: RankingPolicy) -> bool {
    let pipeline = build(docs, ranking);
    let limit = docs.len().max(1);

    let base = retrieved(&pipeline, &query.0, "employee", limit);
    ["finance", "marketing", "hr", "engineering", "c-level"]
        .iter()
        .all(|role| base.is_subset(&retrieved(&pipeline, &query.0, role, limit)))
}

#[quickcheck]
fn prop_role_monotonicity_similarity(docs: Vec<Doc>, query: Query) -> bool {
    monotone_under(&docs, &query, RankingPolicy::Similarity)
}

#[quickcheck]
fn prop_role_monotonicity_department_first(docs: Vec<Doc>, query: Query) -> bool {
    monotone_under(&docs, &query, RankingPolicy::DepartmentFirst)
}

#[quickcheck]
fn prop_department_entries_precede_universal(docs: Vec<Doc>, query: Query, limit: u8) -> bool {
    let pipeline = build(&docs, RankingPolicy::DepartmentFirst);
    let limit = limit as usize % 6 + 1;

    ROLES.iter().chain(std::iter::once(&"c-level")).all(|role| {
        let passages = tokio_test::block_on(pipeline.retrieve(&query.0, role, limit)).unwrap();
        let first_universal = passages
            .iter()
            .position(|p| p.department == "general")
            .unwrap_or(passages.len());
        passages[first_universal..].iter().all(|p| p.department == "general")
    })
}

#[quickcheck]
fn prop_unknown_role_sees_nothing(docs: Vec<Doc>, query: Query) -> bool {
    let pipeline = build(&docs, RankingPolicy::DepartmentFirst);

    let answer = tokio_test::block_on(pipeline.ask(&query.0, "contractor")).unwrap();
    retrieved(&pipeline, &query.0, "contractor", 5).is_empty()
        && answer.answer == no_access_message("contractor")
        && answer.sources.is_empty()
}
