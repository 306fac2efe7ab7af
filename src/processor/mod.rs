//! Response processing: raw backend text in, validated analysis out.
//!
//! [`ResponseProcessor::process()`] tries, in order:
//!
//! 1. strict schema parse ([`extract::parse_structured`])
//! 2. regex extraction of the numeric fields ([`extract::extract_fields`])
//!
//! and validates whatever it obtained ([`validate::validate`]). When both
//! parse paths fail or validation rejects the result, the processor calls
//! its fallback (typically the rule-based scorer) with the original idea.
//! Without a fallback the failure becomes [`MimirError::InvalidResponse`].

pub mod extract;
pub mod validate;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::telemetry;
use crate::types::{
    AnalysisContext, AnalysisResult, Recommendation, ScoreBreakdown, TokenUsage,
};
use crate::{MimirError, Result};

pub use validate::ValidationError;

/// A validated analysis, not yet attributed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    pub scores: ScoreBreakdown,
    pub final_score: f64,
    pub recommendation: Recommendation,
    /// Always present, possibly empty.
    pub explanations: BTreeMap<String, String>,
}

/// How a [`ProcessedResult`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSource {
    /// Strict schema parse.
    Structured,
    /// Regex extraction from loose text.
    Extracted,
    /// Backend output unusable; scored by the fallback.
    Fallback,
}

/// Output of [`ResponseProcessor::process()`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResult {
    pub analysis: ParsedAnalysis,
    pub source: ParseSource,
    pub used_fallback: bool,
}

impl ProcessedResult {
    /// Attribute the analysis to a provider call.
    pub fn into_result(
        self,
        provider: &str,
        duration: Duration,
        usage: Option<TokenUsage>,
    ) -> AnalysisResult {
        let ParsedAnalysis {
            scores,
            final_score,
            recommendation,
            explanations,
        } = self.analysis;
        AnalysisResult {
            scores,
            final_score,
            recommendation,
            explanations,
            provider: provider.to_owned(),
            duration,
            from_cache: false,
            usage,
        }
    }
}

/// Local scoring used when backend output is unusable.
///
/// Receives the original idea text and the caller's context.
pub type FallbackFn =
    Arc<dyn Fn(&str, Option<&AnalysisContext>) -> Result<ParsedAnalysis> + Send + Sync>;

/// Parses and validates raw backend output.
#[derive(Clone, Default)]
pub struct ResponseProcessor {
    fallback: Option<FallbackFn>,
}

impl fmt::Debug for ResponseProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseProcessor")
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl ResponseProcessor {
    /// A processor without fallback: unusable output is an error.
    pub fn new() -> Self {
        Self::default()
    }

    /// A processor that scores unusable output with `fallback`.
    pub fn with_fallback<F>(fallback: F) -> Self
    where
        F: Fn(&str, Option<&AnalysisContext>) -> Result<ParsedAnalysis> + Send + Sync + 'static,
    {
        Self {
            fallback: Some(Arc::new(fallback)),
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Turn raw backend text into a validated analysis.
    pub fn process(
        &self,
        raw: &str,
        idea: &str,
        context: Option<&AnalysisContext>,
    ) -> Result<ProcessedResult> {
        let candidate = extract::parse_structured(raw)
            .map(|c| (c, ParseSource::Structured))
            .or_else(|| extract::extract_fields(raw).map(|c| (c, ParseSource::Extracted)));

        let reason = match candidate {
            Some((candidate, source)) => match validate::validate(candidate) {
                Ok(analysis) => {
                    debug!(?source, "parsed backend response");
                    return Ok(ProcessedResult {
                        analysis,
                        source,
                        used_fallback: false,
                    });
                }
                Err(e) => format!("response failed validation: {e}"),
            },
            None => "response matched neither the schema nor the field patterns".to_string(),
        };

        let Some(fallback) = &self.fallback else {
            return Err(MimirError::InvalidResponse(reason));
        };

        warn!(reason = %reason, "using local fallback for unusable response");
        metrics::counter!(telemetry::PROCESSOR_FALLBACKS_TOTAL).increment(1);
        let analysis = fallback(idea, context)?;
        Ok(ProcessedResult {
            analysis,
            source: ParseSource::Fallback,
            used_fallback: true,
        })
    }
}
