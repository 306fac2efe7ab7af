//! Mimir - resilient idea analysis across heterogeneous model backends
//!
//! This crate scores a short idea against a caller's goals by delegating to
//! one of several backends behind a single [`AnalysisProvider`] trait: a
//! local Ollama server, the OpenAI and Anthropic APIs, and a deterministic
//! rule-based scorer that never fails. Around them it provides ordered
//! fallback, retry with backoff, rate limiting, tolerant response parsing and
//! a similarity-aware cache for near-duplicate ideas.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mimir::{AnalysisContext, AnalysisProvider, AnalysisRequest, CacheConfig, Mimir};
//!
//! #[tokio::main]
//! async fn main() -> mimir::Result<()> {
//!     let chain = Mimir::builder()
//!         .ollama("http://localhost:11434")
//!         .anthropic("sk-ant-your-key")
//!         .cache(CacheConfig::default())
//!         .build()?;
//!
//!     let context = AnalysisContext::new()
//!         .goal("ship the Rust book by Q3")
//!         .avoid("new side projects");
//!     let request = AnalysisRequest::new("write a companion blog series")
//!         .with_context(Arc::new(context));
//!
//!     let result = chain.analyze(&request).await?;
//!     println!("{} ({}) via {}", result.final_score, result.recommendation, result.provider);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod processor;
pub mod providers;
pub mod quality;
pub mod telemetry;
pub mod text;
pub mod types;

// Re-export main types at crate root
pub use builder::{Mimir, MimirBuilder};
pub use cache::{CacheConfig, CacheHit, CacheStats, SimilarityCache};
pub use config::Config;
pub use error::{ErrorKind, MimirError, Result, classify};
pub use processor::{ParseSource, ParsedAnalysis, ProcessedResult, ResponseProcessor};
pub use providers::{
    AnalysisProvider, AnthropicProvider, CachedProvider, FallbackChain, KeywordScorer,
    OllamaProvider, OpenAiProvider, ProviderStatus, RateLimitConfig, RetryConfig,
    RuleBasedProvider, RuleScorer,
};
pub use quality::{QualityMetrics, QualityTracker};
pub use types::{
    AnalysisContext, AnalysisRequest, AnalysisResult, Recommendation, ScoreBreakdown, TokenUsage,
};

/// Crate version.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
