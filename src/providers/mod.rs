//! Analysis backends and the decorators composed around them.
//!
//! Four backends implement [`AnalysisProvider`]: a local model server
//! ([`OllamaProvider`]), two hosted APIs ([`OpenAiProvider`],
//! [`AnthropicProvider`]) and the deterministic [`RuleBasedProvider`].
//! [`CachedProvider`] and [`FallbackChain`] implement the same trait.

pub mod anthropic;
pub mod cached;
pub mod chain;
pub mod http;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod rate_limit;
pub mod retry;
pub mod rule_based;
pub mod traits;

pub use anthropic::AnthropicProvider;
pub use cached::CachedProvider;
pub use chain::{FallbackChain, ProviderStatus};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::RetryConfig;
pub use rule_based::{KeywordScorer, RuleBasedProvider, RuleScorer, fallback_processor};
pub use traits::AnalysisProvider;
