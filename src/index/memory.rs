// In-process vector index over term-frequency vectors
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Candidate, VectorIndex};
use crate::documents::DocumentId;
use crate::errors::Result;

struct Entry {
    id: DocumentId,
    content: String,
    terms: HashMap<String, f32>,
    norm: f32,
}

/// Bag-of-words cosine index held in memory.
///
/// Every stored document is a candidate, so a query always returns
/// `min(count, len)` hits; ties keep insertion order.
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<Vec<Entry>>,
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn term_vector(text: &str) -> (HashMap<String, f32>, f32) {
    let mut terms: HashMap<String, f32> = HashMap::new();
    for token in tokenize(text) {
        *terms.entry(token).or_insert(0.0) += 1.0;
    }
    let norm = terms.values().map(|v| v * v).sum::<f32>().sqrt();
    (terms, norm)
}

fn cosine(query: &HashMap<String, f32>, query_norm: f32, entry: &Entry) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query
        .iter()
        .filter_map(|(term, weight)| entry.terms.get(term).map(|w| w * weight))
        .sum();
    dot / (query_norm * entry.norm)
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn index(&self, id: DocumentId, content: &str) -> Result<()> {
        let (terms, norm) = term_vector(content);
        self.entries.write().await.push(Entry {
            id,
            content: content.to_string(),
            terms,
            norm,
        });
        Ok(())
    }

    async fn query(&self, text: &str, count: usize) -> Result<Vec<Candidate>> {
        let (query_terms, query_norm) = term_vector(text);
        let entries = self.entries.read().await;

        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine(&query_terms, query_norm, entry)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(rank, (pos, score))| Candidate {
                id: entries[pos].id,
                content: entries[pos].content.clone(),
                rank,
                score,
            })
            .collect())
    }
}
