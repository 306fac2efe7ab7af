//! Ordered fallback across providers.
//!
//! The chain holds providers in priority order (index 0 = highest) and
//! tries them sequentially until one succeeds.
//!
//! ```text
//! analyze(request)
//!     │
//!     ▼
//! ┌──────────────┐  unavailable   ┌──────────────┐  error   ┌──────────────┐
//! │   ollama     │ ─────────────► │  anthropic   │ ───────► │  rule_based  │
//! └──────────────┘   (skipped)    └──────────────┘ fallback └──────────────┘
//! ```
//!
//! Every member failure is non-fatal. Only exhaustion is returned, as
//! [`MimirError::AllProvidersFailed`] carrying the last cause, or
//! [`MimirError::NoProvidersAvailable`] when no member was attempted.
//! Members are called one at a time, never in parallel, and the chain adds
//! no deadline of its own.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::traits::AnalysisProvider;
use crate::telemetry;
use crate::types::{AnalysisRequest, AnalysisResult};
use crate::{MimirError, Result};

/// Availability of one chain member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
}

/// Providers tried in order until one succeeds.
#[derive(Clone, Default)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn AnalysisProvider>>,
}

impl fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_providers(providers: Vec<Arc<dyn AnalysisProvider>>) -> Self {
        Self { providers }
    }

    /// Append a provider at the lowest priority.
    pub fn add(&mut self, provider: Arc<dyn AnalysisProvider>) {
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Probe every member, in order.
    pub async fn provider_status(&self) -> Vec<ProviderStatus> {
        let mut status = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            status.push(ProviderStatus {
                name: provider.name().to_string(),
                available: provider.is_available().await,
            });
        }
        status
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl AnalysisProvider for FallbackChain {
    fn name(&self) -> &str {
        "fallback_chain"
    }

    async fn is_available(&self) -> bool {
        for provider in &self.providers {
            if provider.is_available().await {
                return true;
            }
        }
        false
    }

    #[instrument(name = "chain.analyze", skip(self, request), fields(members = self.providers.len()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let mut last_err = None;
        let mut failed_from: Option<&str> = None;

        for provider in &self.providers {
            let name = provider.name();
            if !provider.is_available().await {
                debug!(provider = name, "provider unavailable, skipping");
                continue;
            }
            if let Some(from) = failed_from {
                info!(from, to = name, "falling back");
                telemetry::record_fallback(from, name);
            }

            let start = Instant::now();
            match provider.analyze(request).await {
                Ok(result) => {
                    telemetry::record_request(name, start.elapsed(), true);
                    // Cached results carry the usage of the call that produced them.
                    if let Some(usage) = result.usage.as_ref().filter(|_| !result.from_cache) {
                        telemetry::record_token_usage(name, usage);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    let kind = e.kind();
                    warn!(provider = name, error = %e, kind = %kind, "provider failed");
                    telemetry::record_request(name, start.elapsed(), false);
                    telemetry::record_error(name, kind);
                    failed_from = Some(name);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(last) => MimirError::AllProvidersFailed {
                last: Box::new(last),
            },
            None => MimirError::NoProvidersAvailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::types::{Recommendation, ScoreBreakdown};

    struct Scripted {
        name: &'static str,
        available: bool,
        outcome: fn() -> Result<()>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(name: &'static str, available: bool, outcome: fn() -> Result<()>) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                outcome,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl AnalysisProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()?;
            Ok(AnalysisResult {
                scores: ScoreBreakdown::new(2.0, 2.0, 1.0),
                final_score: 5.0,
                recommendation: Recommendation::ConsiderLater,
                explanations: Default::default(),
                provider: self.name.to_string(),
                duration: Duration::ZERO,
                from_cache: false,
                usage: None,
            })
        }
    }

    fn ok() -> Result<()> {
        Ok(())
    }

    fn timeout() -> Result<()> {
        Err(MimirError::Timeout)
    }

    fn server_error() -> Result<()> {
        Err(MimirError::Api {
            status: 503,
            message: "overloaded".into(),
        })
    }

    #[tokio::test]
    async fn skips_unavailable_and_failed_members() {
        let a = Scripted::new("a", false, ok);
        let b = Scripted::new("b", true, timeout);
        let c = Scripted::new("c", true, ok);
        let chain = FallbackChain::with_providers(vec![a.clone(), b.clone(), c.clone()]);

        let result = chain.analyze(&AnalysisRequest::new("idea")).await.unwrap();
        assert_eq!(result.provider, "c");
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let a = Scripted::new("a", true, ok);
        let b = Scripted::new("b", true, ok);
        let chain = FallbackChain::with_providers(vec![a.clone(), b.clone()]);
        chain.analyze(&AnalysisRequest::new("idea")).await.unwrap();
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhaustion_wraps_last_failure() {
        let chain = FallbackChain::with_providers(vec![
            Scripted::new("a", true, timeout),
            Scripted::new("b", true, server_error),
        ]);
        let err = chain.analyze(&AnalysisRequest::new("idea")).await.unwrap_err();
        match &err {
            MimirError::AllProvidersFailed { last } => {
                assert!(matches!(**last, MimirError::Api { status: 503, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn nothing_attempted_is_no_providers_available() {
        let chain = FallbackChain::with_providers(vec![Scripted::new("a", false, ok)]);
        let err = chain.analyze(&AnalysisRequest::new("idea")).await.unwrap_err();
        assert!(matches!(err, MimirError::NoProvidersAvailable));

        let err = FallbackChain::new()
            .analyze(&AnalysisRequest::new("idea"))
            .await
            .unwrap_err();
        assert!(matches!(err, MimirError::NoProvidersAvailable));
    }

    #[tokio::test]
    async fn availability_and_status() {
        let mut chain = FallbackChain::new();
        chain.add(Scripted::new("a", false, ok));
        assert!(!chain.is_available().await);
        chain.add(Scripted::new("b", true, ok));
        assert!(chain.is_available().await);
        assert_eq!(chain.name(), "fallback_chain");
        assert_eq!(chain.provider_names(), vec!["a", "b"]);
        assert_eq!(
            chain.provider_status().await,
            vec![
                ProviderStatus {
                    name: "a".into(),
                    available: false
                },
                ProviderStatus {
                    name: "b".into(),
                    available: true
                },
            ]
        );
    }
}
