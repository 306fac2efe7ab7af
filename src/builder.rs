//! Builder assembling a fallback chain from backends and decorators.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheConfig, SimilarityCache};
use crate::config::{Config, PROVIDER_NAMES, ProviderConfig};
use crate::providers::{
    AnalysisProvider, AnthropicProvider, CachedProvider, FallbackChain, KeywordScorer,
    OllamaProvider, OpenAiProvider, RateLimitConfig, RetryConfig, RuleBasedProvider, RuleScorer,
    fallback_processor,
};
use crate::types::AnalysisResult;
use crate::{MimirError, Result};

/// Main entry point for assembling an analysis chain.
pub struct Mimir;

impl Mimir {
    /// Create a new builder.
    pub fn builder() -> MimirBuilder {
        MimirBuilder::new()
    }
}

/// Builder for a [`FallbackChain`].
///
/// Networked backends are only added when configured. The rule-based
/// backend is always present and always last. With caching enabled every
/// networked member is wrapped in a [`CachedProvider`]; all wrappers share
/// one cache so a result from any backend serves later near-duplicates.
pub struct MimirBuilder {
    ollama: Option<ProviderConfig>,
    openai: Option<ProviderConfig>,
    anthropic: Option<ProviderConfig>,
    scorer: Arc<dyn RuleScorer>,
    cache: Option<Arc<SimilarityCache<AnalysisResult>>>,
    retry: RetryConfig,
    rate_limit: RateLimitConfig,
    order: Vec<String>,
}

impl Default for MimirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MimirBuilder {
    pub fn new() -> Self {
        Self {
            ollama: None,
            openai: None,
            anthropic: None,
            scorer: Arc::new(KeywordScorer),
            cache: None,
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            order: Config::default().order,
        }
    }

    /// Builder pre-populated from a loaded [`Config`].
    ///
    /// The local backend is always added; hosted backends are added with
    /// whatever key the file or environment provides.
    pub fn from_config(config: &Config) -> Self {
        let hosted = |name: &str, section: &ProviderConfig| ProviderConfig {
            api_key: config.api_key(name),
            ..section.clone()
        };
        let mut builder = Self::new()
            .ollama_config(config.providers.ollama.clone())
            .openai_config(hosted("openai", &config.providers.openai))
            .anthropic_config(hosted("anthropic", &config.providers.anthropic))
            .retry(config.retry.to_retry_config())
            .rate_limit(config.rate_limit.to_rate_limit_config())
            .order(config.resolved_order());
        if config.cache.enabled {
            builder = builder.cache(config.cache.to_cache_config());
        }
        builder
    }

    /// Configure the local backend at `base_url`.
    pub fn ollama(self, base_url: impl Into<String>) -> Self {
        self.ollama_config(ProviderConfig {
            base_url: Some(base_url.into()),
            ..ProviderConfig::default()
        })
    }

    pub fn ollama_config(mut self, config: ProviderConfig) -> Self {
        self.ollama = Some(config);
        self
    }

    /// Configure the OpenAI-style backend.
    pub fn openai(self, api_key: impl Into<String>) -> Self {
        self.openai_config(ProviderConfig {
            api_key: Some(api_key.into()),
            ..ProviderConfig::default()
        })
    }

    pub fn openai_config(mut self, config: ProviderConfig) -> Self {
        self.openai = Some(config);
        self
    }

    /// Configure the Anthropic backend.
    pub fn anthropic(self, api_key: impl Into<String>) -> Self {
        self.anthropic_config(ProviderConfig {
            api_key: Some(api_key.into()),
            ..ProviderConfig::default()
        })
    }

    pub fn anthropic_config(mut self, config: ProviderConfig) -> Self {
        self.anthropic = Some(config);
        self
    }

    /// Scorer for the rule-based backend and for unusable model output.
    pub fn rule_scorer(mut self, scorer: Arc<dyn RuleScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Enable caching with a fresh cache.
    pub fn cache(self, config: CacheConfig) -> Self {
        self.shared_cache(Arc::new(SimilarityCache::new(config)))
    }

    /// Enable caching with a caller-held cache (for stats or reuse).
    pub fn shared_cache(mut self, cache: Arc<SimilarityCache<AnalysisResult>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Retry policy for the hosted backends.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Rate limit applied to each hosted backend.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Fallback order by backend name.
    pub fn order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Build the chain.
    pub fn build(self) -> Result<FallbackChain> {
        let mut order = Vec::with_capacity(self.order.len() + 1);
        for name in &self.order {
            if !PROVIDER_NAMES.contains(&name.as_str()) {
                return Err(MimirError::Configuration(format!(
                    "unknown provider {name:?} in order"
                )));
            }
            if !order.contains(&name.as_str()) {
                order.push(name.as_str());
            }
        }
        order.retain(|name| *name != "rule_based");
        order.push("rule_based");

        let mut chain = FallbackChain::new();
        for name in order {
            if name == "rule_based" {
                chain.add(Arc::new(RuleBasedProvider::with_scorer(Arc::clone(
                    &self.scorer,
                ))));
                continue;
            }
            let Some(provider) = self.networked(name)? else {
                continue;
            };
            let provider: Arc<dyn AnalysisProvider> = match &self.cache {
                Some(cache) => Arc::new(CachedProvider::with_shared_cache(
                    provider,
                    Arc::clone(cache),
                )),
                None => provider,
            };
            chain.add(provider);
        }

        debug!(providers = ?chain.provider_names(), "built fallback chain");
        Ok(chain)
    }

    /// Construct a configured networked backend, or `None` if not configured.
    fn networked(&self, name: &str) -> Result<Option<Arc<dyn AnalysisProvider>>> {
        let processor = fallback_processor(Arc::clone(&self.scorer));
        let provider: Arc<dyn AnalysisProvider> = match name {
            "ollama" => {
                let Some(config) = &self.ollama else {
                    return Ok(None);
                };
                Arc::new(OllamaProvider::from_config(config)?.with_processor(processor))
            }
            "openai" => {
                let Some(config) = &self.openai else {
                    return Ok(None);
                };
                Arc::new(
                    OpenAiProvider::from_config(config)?
                        .with_processor(processor)
                        .with_retry(self.retry.clone())
                        .with_rate_limit(self.rate_limit),
                )
            }
            "anthropic" => {
                let Some(config) = &self.anthropic else {
                    return Ok(None);
                };
                Arc::new(
                    AnthropicProvider::from_config(config)?
                        .with_processor(processor)
                        .with_retry(self.retry.clone())
                        .with_rate_limit(self.rate_limit),
                )
            }
            other => {
                return Err(MimirError::Configuration(format!(
                    "unknown provider {other:?} in order"
                )));
            }
        };
        Ok(Some(provider))
    }
}
