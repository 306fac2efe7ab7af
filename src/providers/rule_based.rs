//! Deterministic local backend.
//!
//! Never touches the network and never fails once given a context, so it
//! sits last in every chain. Scoring is pluggable through [`RuleScorer`];
//! [`KeywordScorer`] is the default.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::instrument;

use super::traits::AnalysisProvider;
use crate::processor::{ParsedAnalysis, ResponseProcessor};
use crate::text;
use crate::types::{
    AnalysisContext, AnalysisRequest, AnalysisResult, MAX_ANTI_CHALLENGE, MAX_FINAL_SCORE,
    MAX_MISSION_ALIGNMENT, MAX_STRATEGIC_FIT, Recommendation, ScoreBreakdown,
};
use crate::{MimirError, Result};

/// Scores an idea against a context without any model.
pub trait RuleScorer: Send + Sync {
    fn score(&self, idea: &str, context: &AnalysisContext) -> ParsedAnalysis;
}

/// Keyword-overlap scorer.
///
/// - mission alignment: share of goals sharing a keyword with the idea
/// - anti-challenge: full marks minus the share of avoid items the idea hits
/// - strategic fit: share of the idea's keywords drawn from the goals
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl RuleScorer for KeywordScorer {
    fn score(&self, idea: &str, context: &AnalysisContext) -> ParsedAnalysis {
        let idea_tokens = text::token_set(idea);
        let goal_sets: Vec<HashSet<String>> =
            context.goals.iter().map(|g| text::token_set(g)).collect();
        let avoid_sets: Vec<HashSet<String>> =
            context.avoid.iter().map(|a| text::token_set(a)).collect();

        let goals_hit = goal_sets
            .iter()
            .filter(|goal| !goal.is_disjoint(&idea_tokens))
            .count();
        let avoid_hit = avoid_sets
            .iter()
            .filter(|item| !item.is_disjoint(&idea_tokens))
            .count();
        let goal_vocab: HashSet<&String> = goal_sets.iter().flatten().collect();
        let on_goal = idea_tokens
            .iter()
            .filter(|t| goal_vocab.contains(t))
            .count();

        let mission = ratio(goals_hit, goal_sets.len()) * MAX_MISSION_ALIGNMENT;
        let anti = (1.0 - ratio(avoid_hit, avoid_sets.len().max(1))) * MAX_ANTI_CHALLENGE;
        let strategic = ratio(on_goal, idea_tokens.len()) * MAX_STRATEGIC_FIT;

        let scores = ScoreBreakdown::new(round1(mission), round1(anti), round1(strategic));
        let final_score = round1(scores.total().min(MAX_FINAL_SCORE));

        let explanations = BTreeMap::from([
            (
                "mission".to_string(),
                format!(
                    "idea shares keywords with {goals_hit} of {} goals",
                    goal_sets.len()
                ),
            ),
            (
                "anti_challenge".to_string(),
                format!(
                    "idea touches {avoid_hit} of {} things to avoid",
                    avoid_sets.len()
                ),
            ),
            (
                "strategic".to_string(),
                format!(
                    "{on_goal} of {} idea keywords come from the goals",
                    idea_tokens.len()
                ),
            ),
        ]);

        ParsedAnalysis {
            scores,
            final_score,
            recommendation: Recommendation::for_score(final_score),
            explanations,
        }
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A processor whose fallback is `scorer`.
///
/// Used by the model-backed providers so an unusable response still yields
/// an analysis. Without a context the scorer sees an empty one.
pub fn fallback_processor(scorer: Arc<dyn RuleScorer>) -> ResponseProcessor {
    ResponseProcessor::with_fallback(move |idea, context| {
        let empty = AnalysisContext::default();
        Ok(scorer.score(idea, context.unwrap_or(&empty)))
    })
}

/// Backend scoring ideas with a [`RuleScorer`].
#[derive(Clone)]
pub struct RuleBasedProvider {
    scorer: Arc<dyn RuleScorer>,
}

impl fmt::Debug for RuleBasedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBasedProvider").finish_non_exhaustive()
    }
}

impl Default for RuleBasedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedProvider {
    /// A provider using [`KeywordScorer`].
    pub fn new() -> Self {
        Self::with_scorer(Arc::new(KeywordScorer))
    }

    pub fn with_scorer(scorer: Arc<dyn RuleScorer>) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> Arc<dyn RuleScorer> {
        Arc::clone(&self.scorer)
    }
}

#[async_trait]
impl AnalysisProvider for RuleBasedProvider {
    fn name(&self) -> &str {
        "rule_based"
    }

    async fn is_available(&self) -> bool {
        true
    }

    #[instrument(name = "rule_based.analyze", skip(self, request))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let start = Instant::now();
        let context = request.context().ok_or_else(|| {
            MimirError::InvalidRequest("rule-based analysis requires a context".into())
        })?;
        let analysis = self.scorer.score(request.idea(), context);
        Ok(AnalysisResult {
            scores: analysis.scores,
            final_score: analysis.final_score,
            recommendation: analysis.recommendation,
            explanations: analysis.explanations,
            provider: self.name().to_string(),
            duration: start.elapsed(),
            from_cache: false,
            usage: None,
        })
    }
}
