//! End-to-end tests for chains assembled by the builder.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mimir::{
    AnalysisContext, AnalysisProvider, AnalysisRequest, AnalysisResult, CacheConfig,
    CachedProvider, FallbackChain, Mimir, MimirError, Recommendation, Result, RetryConfig,
    ScoreBreakdown, SimilarityCache,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANALYSIS_JSON: &str = r#"{"mission_alignment": 3.0, "anti_challenge": 3.0, "strategic_fit": 1.5, "final_score": 7.5, "recommendation": "prioritize_now"}"#;

fn request(idea: &str) -> AnalysisRequest {
    let context = AnalysisContext::new().goal("grow the Rust newsletter");
    AnalysisRequest::new(idea).with_context(Arc::new(context))
}

// ============================================================================
// Mock providers
// ============================================================================

struct MockProvider {
    name: &'static str,
    available: bool,
    fail_with: Option<fn() -> MimirError>,
    calls: AtomicU32,
}

impl MockProvider {
    fn ok(name: &'static str) -> Arc<Self> {
        Self::build(name, true, None)
    }

    fn failing(name: &'static str, err: fn() -> MimirError) -> Arc<Self> {
        Self::build(name, true, Some(err))
    }

    fn unavailable(name: &'static str) -> Arc<Self> {
        Self::build(name, false, None)
    }

    fn build(name: &'static str, available: bool, fail_with: Option<fn() -> MimirError>) -> Arc<Self> {
        Arc::new(Self {
            name,
            available,
            fail_with,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with {
            return Err(err());
        }
        Ok(AnalysisResult {
            scores: ScoreBreakdown::new(3.0, 3.0, 2.0),
            final_score: 8.0,
            recommendation: Recommendation::PrioritizeNow,
            explanations: Default::default(),
            provider: self.name.to_string(),
            duration: Duration::from_millis(1),
            from_cache: false,
            usage: None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn unavailable_member_is_never_called() {
    let a = MockProvider::unavailable("a");
    let b = MockProvider::failing("b", || MimirError::Timeout);
    let c = MockProvider::ok("c");
    let chain = FallbackChain::with_providers(vec![a.clone(), b.clone(), c.clone()]);

    let result = chain.analyze(&request("idea")).await.unwrap();
    assert_eq!(result.provider, "c");
    assert_eq!(a.calls(), 0);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn exhaustion_message_carries_last_failure() {
    let chain = FallbackChain::with_providers(vec![
        MockProvider::failing("a", || MimirError::Timeout),
        MockProvider::failing("b", || MimirError::Http("connection refused".into())),
    ]);
    let err = chain.analyze(&request("idea")).await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn cached_members_share_results_across_the_chain() {
    let cache = Arc::new(SimilarityCache::new(CacheConfig::default()));
    let primary = MockProvider::ok("primary");
    let chain = FallbackChain::with_providers(vec![Arc::new(CachedProvider::with_shared_cache(
        primary.clone(),
        Arc::clone(&cache),
    ))]);

    let first = chain.analyze(&request("Weekly Rust newsletter issue")).await.unwrap();
    let second = chain.analyze(&request("weekly rust newsletter issue.")).await.unwrap();
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(primary.calls(), 1);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[tokio::test]
async fn cached_hit_does_not_mutate_stored_result() {
    let cache = Arc::new(SimilarityCache::new(CacheConfig::default()));
    let cached = CachedProvider::with_shared_cache(MockProvider::ok("p"), Arc::clone(&cache));

    cached.analyze(&request("an idea")).await.unwrap();
    let hit = cached.analyze(&request("an idea")).await.unwrap();
    assert!(hit.from_cache);
    let stored = cache.get("an idea").unwrap();
    assert!(!stored.value.from_cache);
}

#[tokio::test]
async fn builder_chain_falls_back_from_local_to_hosted() {
    let ollama = MockServer::start().await;
    let openai = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&ollama)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&ollama)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": ANALYSIS_JSON}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        })))
        .expect(1)
        .mount(&openai)
        .await;

    let chain = Mimir::builder()
        .ollama(ollama.uri())
        .openai_config(mimir::config::ProviderConfig {
            base_url: Some(openai.uri()),
            api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .retry(RetryConfig::disabled())
        .order(["ollama", "openai"])
        .cache(CacheConfig::default())
        .build()
        .unwrap();

    let result = chain.analyze(&request("Rust newsletter")).await.unwrap();
    assert_eq!(result.provider, "openai");
    assert_eq!(result.final_score, 7.5);

    // Served from the shared cache by the first available member.
    let again = chain.analyze(&request("rust newsletter")).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(again.provider, "openai");
}

#[tokio::test]
async fn builder_chain_ends_in_rule_based() {
    let chain = Mimir::builder()
        .ollama("http://127.0.0.1:9")
        .build()
        .unwrap();
    assert_eq!(chain.provider_names(), vec!["ollama", "rule_based"]);

    let result = chain.analyze(&request("grow the newsletter")).await.unwrap();
    assert_eq!(result.provider, "rule_based");
    assert_eq!(result.scores.mission_alignment, 4.0);
}

#[tokio::test]
async fn rule_based_without_context_exhausts_chain() {
    let chain = Mimir::builder().build().unwrap();
    let err = chain
        .analyze(&AnalysisRequest::new("no context"))
        .await
        .unwrap_err();
    match err {
        MimirError::AllProvidersFailed { last } => {
            assert!(matches!(*last, MimirError::InvalidRequest(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
