//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use mimir::providers::fallback_processor;
use mimir::telemetry;
use mimir::{
    AnalysisContext, AnalysisProvider, AnalysisRequest, AnalysisResult, CacheConfig,
    CachedProvider, FallbackChain, KeywordScorer, MimirError, Recommendation, Result,
    ScoreBreakdown, TokenUsage,
};

// ============================================================================
// Mock providers
// ============================================================================

struct MockProvider {
    name: &'static str,
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult> {
        Ok(AnalysisResult {
            scores: ScoreBreakdown::new(3.0, 3.0, 2.0),
            final_score: 8.0,
            recommendation: Recommendation::PrioritizeNow,
            explanations: Default::default(),
            provider: self.name.to_string(),
            duration: Duration::from_millis(3),
            from_cache: false,
            usage: Some(TokenUsage {
                input_tokens: 100,
                output_tokens: 20,
            }),
        })
    }
}

struct FailingProvider;

#[async_trait]
impl AnalysisProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult> {
        Err(MimirError::RateLimited { retry_after: None })
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_with_label(snapshot, name, None)
}

/// Sum counter values matching a name and, optionally, one label.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            Some((k, v)) => key.key().labels().any(|l| l.key() == k && l.value() == v),
            None => true,
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn recorded<F: Future>(fut: F) -> (F::Output, Snapshotter) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter)
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new("idea").with_context(Arc::new(AnalysisContext::new().goal("goal")))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_request_records_metrics() {
    let (result, snapshotter) = recorded(async {
        let chain = FallbackChain::with_providers(vec![Arc::new(MockProvider { name: "mock" })]);
        chain.analyze(&request()).await
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, Some(("status", "ok"))),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, Some(("direction", "input"))),
        100
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, Some(("direction", "output"))),
        20
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn fallback_records_error_and_transition() {
    let (result, snapshotter) = recorded(async {
        let chain = FallbackChain::with_providers(vec![
            Arc::new(FailingProvider),
            Arc::new(MockProvider { name: "backup" }),
        ]);
        chain.analyze(&request()).await
    });
    assert_eq!(result.unwrap().provider, "backup");

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 2);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::ERRORS_TOTAL, Some(("kind", "rate_limit"))),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::FALLBACKS_TOTAL, Some(("to", "backup"))),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_records_hits_and_misses() {
    let (_, snapshotter) = recorded(async {
        let cached = CachedProvider::new(
            Arc::new(MockProvider { name: "mock" }),
            CacheConfig::default(),
        );
        cached.analyze(&request()).await.unwrap();
        cached.analyze(&request()).await.unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_HITS_TOTAL, Some(("match", "exact"))),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hits_through_chain_do_not_count_tokens() {
    let (results, snapshotter) = recorded(async {
        let cached = CachedProvider::new(
            Arc::new(MockProvider { name: "mock" }),
            CacheConfig::default(),
        );
        let chain = FallbackChain::with_providers(vec![Arc::new(cached)]);
        let first = chain.analyze(&request()).await.unwrap();
        let second = chain.analyze(&request()).await.unwrap();
        (first, second)
    });
    let (first, second) = results;
    assert!(!first.from_cache);
    assert!(second.from_cache);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 2);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, Some(("direction", "input"))),
        100
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, Some(("direction", "output"))),
        20
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn processor_fallback_is_counted() {
    let (result, snapshotter) = recorded(async {
        fallback_processor(Arc::new(KeywordScorer)).process("not an analysis", "idea", None)
    });
    assert!(result.unwrap().used_fallback);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::PROCESSOR_FALLBACKS_TOTAL),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let chain = FallbackChain::with_providers(vec![Arc::new(MockProvider { name: "test" })]);
    chain.analyze(&request()).await.unwrap();
}
