//! The capability contract every analysis backend implements.
//!
//! Backends, the [`CachedProvider`](super::CachedProvider) decorator and the
//! [`FallbackChain`](super::FallbackChain) all implement [`AnalysisProvider`],
//! so they nest freely: a chain of cached backends, a cached chain, or a
//! chain containing another chain.
//!
//! # Availability
//!
//! `is_available()` is a cheap probe. Hosted backends check for a
//! credential, the local backend pings its server with a short timeout and
//! the rule-based backend is always available. The chain skips members that
//! report `false` without calling `analyze()` on them.
//!
//! # Example
//!
//! ```ignore
//! async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
//!     let raw = self.complete(&prompt::user_prompt(request)).await?;
//!     let processed = self.processor.process(&raw, request.idea(), request.context())?;
//!     Ok(processed.into_result(self.name(), start.elapsed(), None))
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::{AnalysisRequest, AnalysisResult};

/// An analysis backend.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Provider name for logging and metric labels.
    fn name(&self) -> &str;

    /// Whether this provider can be tried right now.
    async fn is_available(&self) -> bool;

    /// Analyze one idea.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult>;
}
