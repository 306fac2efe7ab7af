//! Integration tests for response processing.

use std::collections::BTreeMap;
use std::sync::Arc;

use mimir::providers::fallback_processor;
use mimir::{
    AnalysisContext, KeywordScorer, MimirError, ParseSource, ParsedAnalysis, Recommendation,
    ResponseProcessor, ScoreBreakdown,
};

fn sentinel_fallback() -> ResponseProcessor {
    ResponseProcessor::with_fallback(|_idea, _context| {
        Ok(ParsedAnalysis {
            scores: ScoreBreakdown::new(0.5, 0.5, 0.5),
            final_score: 1.5,
            recommendation: Recommendation::Avoid,
            explanations: BTreeMap::new(),
        })
    })
}

#[test]
fn numeric_fields_in_prose_are_extracted() {
    let raw = r#"After some thought: "mission_alignment": 3.2, "anti_challenge": 2.5, "strategic_fit": 1.8, "final_score": 7.5. Hope that helps."#;
    let result = sentinel_fallback().process(raw, "idea", None).unwrap();
    assert!(!result.used_fallback);
    assert_eq!(result.source, ParseSource::Extracted);
    assert_eq!(result.analysis.scores, ScoreBreakdown::new(3.2, 2.5, 1.8));
    assert_eq!(result.analysis.final_score, 7.5);
    assert_eq!(result.analysis.recommendation, Recommendation::PrioritizeNow);
}

#[test]
fn fenced_json_is_structured() {
    let raw = "```json\n{\"mission_alignment\": 2, \"anti_challenge\": 2, \"strategic_fit\": 1, \"final_score\": 5, \"recommendation\": \"Consider Later\", \"explanations\": {\"mission\": \"partly\"}}\n```";
    let result = ResponseProcessor::new().process(raw, "idea", None).unwrap();
    assert_eq!(result.source, ParseSource::Structured);
    assert_eq!(result.analysis.recommendation, Recommendation::ConsiderLater);
    assert_eq!(result.analysis.explanations["mission"], "partly");
}

#[test]
fn unparseable_with_fallback_returns_fallback_result() {
    let result = sentinel_fallback()
        .process("Sorry, I can't evaluate that.", "idea", None)
        .unwrap();
    assert!(result.used_fallback);
    assert_eq!(result.source, ParseSource::Fallback);
    assert_eq!(result.analysis.final_score, 1.5);
}

#[test]
fn unparseable_without_fallback_is_error() {
    let err = ResponseProcessor::new()
        .process("Sorry, I can't evaluate that.", "idea", None)
        .unwrap_err();
    assert!(matches!(err, MimirError::InvalidResponse(_)));
}

#[test]
fn out_of_range_scores_are_rejected() {
    let raw = r#"{"mission_alignment": 3, "anti_challenge": 3, "strategic_fit": 2, "final_score": 11, "recommendation": "prioritize_now"}"#;
    let err = ResponseProcessor::new().process(raw, "idea", None).unwrap_err();
    assert!(matches!(err, MimirError::InvalidResponse(_)));

    let result = sentinel_fallback().process(raw, "idea", None).unwrap();
    assert!(result.used_fallback);
}

#[test]
fn prose_recommendation_does_not_discard_extracted_scores() {
    let raw = "mission_alignment: 2, anti_challenge: 2, strategic_fit: 1, final_score: 5\n\
               My recommendation: you should sleep on it";
    let result = sentinel_fallback().process(raw, "idea", None).unwrap();
    assert!(!result.used_fallback);
    assert_eq!(result.source, ParseSource::Extracted);
    assert_eq!(result.analysis.recommendation, Recommendation::ConsiderLater);
}

#[test]
fn unknown_recommendation_is_rejected() {
    let raw = r#"{"mission_alignment": 3, "anti_challenge": 3, "strategic_fit": 2, "final_score": 8, "recommendation": "ship it"}"#;
    let err = ResponseProcessor::new().process(raw, "idea", None).unwrap_err();
    assert!(err.to_string().contains("ship it"));
}

#[test]
fn keyword_fallback_sees_context() {
    let context = AnalysisContext::new().goal("launch the Rust podcast");
    let processor = fallback_processor(Arc::new(KeywordScorer));
    let result = processor
        .process("garbage", "record a Rust podcast pilot", Some(&context))
        .unwrap();
    assert!(result.used_fallback);
    assert_eq!(result.analysis.scores.mission_alignment, 4.0);
}
