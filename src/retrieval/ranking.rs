// Department-aware ordering of access-filtered passages
use serde::{Deserialize, Serialize};

use super::Passage;

/// Ordering applied after the access filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPolicy {
    /// Department-specific passages first, universal ones fill the rest
    #[default]
    DepartmentFirst,
    /// Raw similarity order from the index
    Similarity,
}

/// Order `passages` (already best-first) and cut to `limit`.
///
/// Under `DepartmentFirst` each group keeps its own similarity order and
/// the groups are concatenated, never interleaved.
pub fn rank<F>(passages: Vec<Passage>, policy: RankingPolicy, limit: usize, is_universal: F) -> Vec<Passage>
where
    F: Fn(&str) -> bool,
{
    match policy {
        RankingPolicy::Similarity => passages.into_iter().take(limit).collect(),
        RankingPolicy::DepartmentFirst => {
            let (universal, mut ranked): (Vec<Passage>, Vec<Passage>) = passages
                .into_iter()
                .partition(|p| is_universal(&p.department));

            ranked.truncate(limit);
            let remaining = limit - ranked.len();
            ranked.extend(universal.into_iter().take(remaining));
            ranked
        }
    }
}
