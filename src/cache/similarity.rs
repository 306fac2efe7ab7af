//! LRU + TTL cache with approximate-match lookup.
//!
//! [`SimilarityCache`] is keyed on the normalized text of an idea. A lookup
//! first tries the exact key, then scans every live entry for the one whose
//! token set is most similar to the query (Jaccard, see [`crate::text`]).
//! The scan is linear in the number of entries, which the capacity bound
//! (default 1,000) keeps small.
//!
//! # Locking
//!
//! One `RwLock` guards the whole cache. `get` promotes the matched entry and
//! bumps counters, so it takes the write lock; `stats` and `len` take the
//! read lock.
//!
//! # Time
//!
//! Ages are measured with `tokio::time::Instant`, so tests can drive expiry
//! with a paused clock.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::recency::RecencyList;
use crate::telemetry;
use crate::text;

/// Configuration for the similarity cache.
///
/// ```rust
/// # use mimir::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(3600))
///     .similarity_threshold(0.9);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 24 hours.
    pub ttl: Duration,
    /// Minimum similarity for an approximate match. Default: 0.85.
    pub similarity_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(24 * 60 * 60),
            similarity_threshold: 0.85,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the minimum similarity accepted for an approximate match.
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 when nothing was looked up.
    pub hit_rate: f64,
    /// Mean hit counter over current entries, or 0 when empty.
    pub avg_hits_per_entry: f64,
    pub entries: usize,
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub value: V,
    /// 1.0 for an exact key match.
    pub similarity: f64,
    /// Whether the exact normalized key matched.
    pub exact: bool,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    tokens: HashSet<String>,
    cached_at: Instant,
    hits: u64,
    last_similarity: f64,
    node: usize,
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    recency: RecencyList,
    hits: u64,
    misses: u64,
}

impl<V> Inner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyList::new(),
            hits: 0,
            misses: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(entry.node);
        Some(entry)
    }

    fn record_hit(&mut self, key: &str, similarity: f64) -> Option<&CacheEntry<V>> {
        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        entry.last_similarity = similarity;
        self.recency.move_to_front(entry.node);
        self.hits += 1;
        self.entries.get(key)
    }
}

/// Thread-safe similarity cache.
///
/// Generic over the cached payload so it stays independent of the result
/// types that use it.
#[derive(Debug)]
pub struct SimilarityCache<V> {
    config: CacheConfig,
    inner: RwLock<Inner<V>>,
}

impl<V: Clone> SimilarityCache<V> {
    /// Create a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value` under the normalized form of `text`.
    ///
    /// Replaces any entry with the same key. Evicts the least recently used
    /// entry when capacity is exceeded.
    pub fn store(&self, text: &str, value: V) {
        let key = text::normalize(text);
        let tokens = text::token_set(&key);
        let mut inner = self.write();

        inner.remove(&key);
        let node = inner.recency.push_front(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                tokens,
                cached_at: Instant::now(),
                hits: 0,
                last_similarity: 1.0,
                node,
            },
        );

        while inner.entries.len() > self.config.max_entries {
            let Some(tail) = inner.recency.back() else {
                break;
            };
            if let Some(evicted) = inner.recency.remove(tail) {
                debug!(key = %evicted, "evicting least recently used cache entry");
                inner.entries.remove(&evicted);
            }
        }
    }

    /// Look up `text`, exactly or approximately.
    ///
    /// Returns `None` on a miss. Emits cache hit/miss metrics.
    pub fn get(&self, text: &str) -> Option<CacheHit<V>> {
        let key = text::normalize(text);
        let now = Instant::now();
        let mut inner = self.write();

        match inner.entries.get(&key).map(|e| self.is_expired(e, now)) {
            Some(true) => {
                debug!(key = %key, "exact cache entry expired");
                inner.remove(&key);
            }
            Some(false) => {
                if let Some(entry) = inner.record_hit(&key, 1.0) {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "match" => "exact")
                        .increment(1);
                    return Some(CacheHit {
                        value: entry.value.clone(),
                        similarity: 1.0,
                        exact: true,
                    });
                }
            }
            None => {}
        }

        let query = text::token_set(&key);
        let mut expired = Vec::new();
        let mut best: Option<(String, f64)> = None;
        // Most recently used first; on equal similarity the earlier one wins.
        for candidate in inner.recency.iter() {
            let Some(entry) = inner.entries.get(candidate) else {
                continue;
            };
            if self.is_expired(entry, now) {
                expired.push(candidate.to_owned());
                continue;
            }
            let score = text::jaccard(&query, &entry.tokens);
            if score >= self.config.similarity_threshold
                && best.as_ref().is_none_or(|(_, s)| score > *s)
            {
                best = Some((candidate.to_owned(), score));
            }
        }
        for key in &expired {
            inner.remove(key);
        }

        if let Some((matched, score)) = best {
            if let Some(entry) = inner.record_hit(&matched, score) {
                debug!(query = %key, matched = %matched, similarity = score, "approximate cache hit");
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "match" => "similar").increment(1);
                return Some(CacheHit {
                    value: entry.value.clone(),
                    similarity: score,
                    exact: false,
                });
            }
        }

        inner.misses += 1;
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        None
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.read();
        let lookups = inner.hits + inner.misses;
        let entries = inner.entries.len();
        let entry_hits: u64 = inner.entries.values().map(|e| e.hits).sum();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
            avg_hits_per_entry: if entries == 0 {
                0.0
            } else {
                entry_hits as f64 / entries as f64
            },
            entries,
        }
    }

    /// Empty the cache and reset its counters.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.entries.clear();
        inner.recency.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.write();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| self.is_expired(e, now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Number of entries, including any not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.read().recency.iter().map(str::to_owned).collect()
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.cached_at) > self.config.ttl
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for SimilarityCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
