//! Similarity-cache decorator for any provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::traits::AnalysisProvider;
use crate::Result;
use crate::cache::{CacheConfig, CacheStats, SimilarityCache};
use crate::types::{AnalysisRequest, AnalysisResult};

/// Wraps a provider with a [`SimilarityCache`] keyed by the idea text.
///
/// Hits return a copy of the stored result with `from_cache` set. Only
/// successful results are stored; failures pass through untouched.
pub struct CachedProvider {
    inner: Arc<dyn AnalysisProvider>,
    cache: Arc<SimilarityCache<AnalysisResult>>,
    name: String,
}

impl CachedProvider {
    /// Wrap `inner` with a private cache.
    pub fn new(inner: Arc<dyn AnalysisProvider>, config: CacheConfig) -> Self {
        Self::with_shared_cache(inner, Arc::new(SimilarityCache::new(config)))
    }

    /// Wrap `inner` with a cache shared with other wrappers.
    pub fn with_shared_cache(
        inner: Arc<dyn AnalysisProvider>,
        cache: Arc<SimilarityCache<AnalysisResult>>,
    ) -> Self {
        let name = format!("{} (cached)", inner.name());
        Self { inner, cache, name }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &Arc<SimilarityCache<AnalysisResult>> {
        &self.cache
    }

    pub fn inner(&self) -> &Arc<dyn AnalysisProvider> {
        &self.inner
    }
}

#[async_trait]
impl AnalysisProvider for CachedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    #[instrument(name = "cached.analyze", skip(self, request), fields(provider = %self.inner.name()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        if let Some(hit) = self.cache.get(request.idea()) {
            debug!(similarity = hit.similarity, exact = hit.exact, "cache hit");
            let mut result = hit.value;
            result.from_cache = true;
            return Ok(result);
        }

        let result = self.inner.analyze(request).await?;
        self.cache.store(request.idea(), result.clone());
        Ok(result)
    }
}
