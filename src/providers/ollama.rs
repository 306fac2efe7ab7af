//! Local model server backend (Ollama generate API).
//!
//! See: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::http::{PROBE_TIMEOUT, build_client, check_status};
use super::prompt;
use super::traits::AnalysisProvider;
use crate::config::ProviderConfig;
use crate::processor::ResponseProcessor;
use crate::types::{AnalysisRequest, AnalysisResult};
use crate::{MimirError, Result};

/// Default Ollama base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default local model.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Local generation can be slow on CPU.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend talking to a local Ollama server.
///
/// Does not retry: a local failure falls through to the next chain member.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: Client,
    base_url: String,
    model: String,
    processor: ResponseProcessor,
}

impl OllamaProvider {
    /// Create a provider for the default local server.
    pub fn new() -> Result<Self> {
        Self::from_config(&ProviderConfig::default())
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(config.timeout().unwrap_or(DEFAULT_TIMEOUT))?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            processor: ResponseProcessor::new(),
        })
    }

    /// Point at a different server (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use `processor` for parsing responses.
    pub fn with_processor(mut self, processor: ResponseProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: GenerateResponse = response.json().await?;
        if body.response.trim().is_empty() {
            return Err(MimirError::InvalidResponse(
                "empty response from local model".into(),
            ));
        }
        Ok(body.response)
    }
}

#[async_trait]
impl AnalysisProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "ollama probe failed");
                false
            }
        }
    }

    #[instrument(name = "ollama.analyze", skip(self, request), fields(model = %self.model))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let start = Instant::now();
        let raw = self.generate(&prompt::combined_prompt(request)).await?;
        let processed = self
            .processor
            .process(&raw, request.idea(), request.context())?;
        Ok(processed.into_result(self.name(), start.elapsed(), None))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
