//! Anthropic Messages API backend.
//!
//! See: <https://docs.anthropic.com/en/api/messages>

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::instrument;

use super::http::{build_client, check_status};
use super::prompt;
use super::rate_limit::{RateLimitConfig, RateLimiter};
use super::retry::{RetryConfig, with_retry};
use super::traits::AnalysisProvider;
use crate::config::ProviderConfig;
use crate::processor::ResponseProcessor;
use crate::types::{AnalysisRequest, AnalysisResult, TokenUsage};
use crate::{MimirError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Value of the `anthropic-version` header.
const API_VERSION: &str = "2023-06-01";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Backend for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    processor: ResponseProcessor,
    retry: RetryConfig,
    limiter: Arc<RateLimiter>,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(&ProviderConfig {
            api_key: Some(api_key.into()),
            ..ProviderConfig::default()
        })
    }

    /// Create a provider from configuration. A missing key leaves the
    /// provider unavailable rather than failing construction.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            http: build_client(config.timeout().unwrap_or(DEFAULT_TIMEOUT))?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature,
            processor: ResponseProcessor::new(),
            retry: RetryConfig::default(),
            limiter: Arc::new(RateLimiter::default()),
        })
    }

    /// Point at a different endpoint (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_processor(mut self, processor: ResponseProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = Arc::new(RateLimiter::new(config));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<(String, Option<TokenUsage>)> {
        self.limiter.acquire(self.name()).await;

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                system,
                messages: [Message {
                    role: "user",
                    content: user,
                }],
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: MessagesResponse = response.json().await?;

        let text = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(MimirError::InvalidResponse("no text content".into()));
        }
        let usage = body.usage.map(|u| TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        });
        Ok((text, usage))
    }
}

#[async_trait]
impl AnalysisProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    #[instrument(name = "anthropic.analyze", skip(self, request), fields(model = %self.model))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let start = Instant::now();
        let system = prompt::system_prompt();
        let user = prompt::user_prompt(request);
        let (raw, usage) =
            with_retry(&self.retry, self.name(), || self.complete(&system, &user)).await?;
        let processed = self
            .processor
            .process(&raw, request.idea(), request.context())?;
        Ok(processed.into_result(self.name(), start.elapsed(), usage))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
