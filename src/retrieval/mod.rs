//! Role-aware retrieval
//!
//! - Engine: over-fetch from the index, resolve, filter by role, truncate
//! - Ranking: department-first or plain similarity ordering

pub mod engine;
pub mod ranking;

pub use engine::{Passage, RetrievalConfig, RetrievalEngine};
pub use ranking::RankingPolicy;
