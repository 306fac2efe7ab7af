//! Caching subsystem.
//!
//! [`SimilarityCache`] is a bounded LRU + TTL store that also answers
//! lookups for near-duplicate text. [`CachedProvider`](crate::providers::CachedProvider)
//! puts one in front of any analysis backend.

mod recency;
pub mod similarity;

pub use similarity::{CacheConfig, CacheHit, CacheStats, SimilarityCache};
