//! Reading candidate analyses out of raw backend text.
//!
//! Two strategies, tried in order by the processor:
//!
//! 1. [`parse_structured()`] — the JSON schema, either as the whole text or
//!    as the outermost `{ ... }` object embedded in prose or code fences.
//! 2. [`extract_fields()`] — regex scraping of the four numeric fields from
//!    loosely structured text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::types::{Recommendation, ScoreBreakdown};

use super::validate::Candidate;

/// Schema the prompts ask backends to answer in.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    mission_alignment: f64,
    anti_challenge: f64,
    strategic_fit: f64,
    final_score: f64,
    recommendation: String,
    #[serde(default)]
    explanations: Option<BTreeMap<String, String>>,
}

impl From<RawAnalysis> for Candidate {
    fn from(raw: RawAnalysis) -> Self {
        Candidate {
            scores: ScoreBreakdown::new(raw.mission_alignment, raw.anti_challenge, raw.strategic_fit),
            final_score: raw.final_score,
            recommendation: raw.recommendation,
            explanations: raw.explanations.unwrap_or_default(),
        }
    }
}

/// Strict schema parse.
pub fn parse_structured(raw: &str) -> Option<Candidate> {
    let trimmed = raw.trim();
    if let Ok(parsed) = serde_json::from_str::<RawAnalysis>(trimmed) {
        return Some(parsed.into());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<RawAnalysis>(&trimmed[start..=end])
        .ok()
        .map(Candidate::from)
}

fn numeric_field(name: &str) -> Regex {
    let pattern = format!(r#"(?i)"?{name}"?\s*[:=]\s*"?(-?\d+(?:\.\d+)?)"#);
    Regex::new(&pattern).expect("numeric field pattern is valid")
}

static MISSION_RE: LazyLock<Regex> = LazyLock::new(|| numeric_field("mission_alignment"));
static ANTI_CHALLENGE_RE: LazyLock<Regex> = LazyLock::new(|| numeric_field("anti_challenge"));
static STRATEGIC_RE: LazyLock<Regex> = LazyLock::new(|| numeric_field("strategic_fit"));
static FINAL_RE: LazyLock<Regex> = LazyLock::new(|| numeric_field("final_score"));

static RECOMMENDATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?recommendation"?\s*[:=]\s*"?([^"\n,}]+)"#)
        .expect("recommendation pattern is valid")
});

/// `"key": "text"` pairs, with escaped quotes allowed inside the text.
static STRING_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([A-Za-z_][A-Za-z0-9_]*)"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("string pair pattern is valid")
});

/// Best-effort extraction from unstructured text.
///
/// All four numeric fields must be present. The recommendation is taken
/// from the text when it names a known label and otherwise derived from
/// the final score.
/// Any quoted string pairs become explanations.
pub fn extract_fields(raw: &str) -> Option<Candidate> {
    let mission_alignment = capture_number(&MISSION_RE, raw)?;
    let anti_challenge = capture_number(&ANTI_CHALLENGE_RE, raw)?;
    let strategic_fit = capture_number(&STRATEGIC_RE, raw)?;
    let final_score = capture_number(&FINAL_RE, raw)?;

    // Prose like "my recommendation: ..." captures no usable label.
    let recommendation = RECOMMENDATION_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|label| Recommendation::from_label(label).is_some())
        .unwrap_or_else(|| Recommendation::for_score(final_score).as_str().to_owned());

    let explanations = STRING_PAIR_RE
        .captures_iter(raw)
        .filter_map(|c| {
            let key = c.get(1)?.as_str();
            if key.eq_ignore_ascii_case("recommendation") {
                return None;
            }
            Some((key.to_owned(), c.get(2)?.as_str().replace("\\\"", "\"")))
        })
        .collect();

    Some(Candidate {
        scores: ScoreBreakdown::new(mission_alignment, anti_challenge, strategic_fit),
        final_score,
        recommendation,
        explanations,
    })
}

fn capture_number(re: &Regex, raw: &str) -> Option<f64> {
    re.captures(raw)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "mission_alignment": 3.5,
        "anti_challenge": 3.0,
        "strategic_fit": 2.0,
        "final_score": 8.5,
        "recommendation": "prioritize_now",
        "explanations": {"mission": "Directly serves the goal."}
    }"#;

    #[test]
    fn parses_bare_json() {
        let c = parse_structured(JSON).unwrap();
        assert_eq!(c.scores, ScoreBreakdown::new(3.5, 3.0, 2.0));
        assert_eq!(c.final_score, 8.5);
        assert_eq!(c.recommendation, "prioritize_now");
        assert_eq!(c.explanations["mission"], "Directly serves the goal.");
    }

    #[test]
    fn parses_json_inside_code_fence() {
        let raw = format!("Here is my analysis:\n```json\n{JSON}\n```\nHope this helps.");
        assert!(parse_structured(&raw).is_some());
    }

    #[test]
    fn null_explanations_become_empty() {
        let raw = r#"{"mission_alignment": 1, "anti_challenge": 1, "strategic_fit": 1,
                      "final_score": 3, "recommendation": "avoid", "explanations": null}"#;
        let c = parse_structured(raw).unwrap();
        assert!(c.explanations.is_empty());
    }

    #[test]
    fn structured_rejects_missing_field() {
        let raw = r#"{"mission_alignment": 1, "anti_challenge": 1, "final_score": 3, "recommendation": "avoid"}"#;
        assert!(parse_structured(raw).is_none());
    }

    #[test]
    fn extracts_fields_from_prose() {
        let raw = r#"I think "mission_alignment": 3.2, "anti_challenge": 2.5, "strategic_fit": 1.8, "final_score": 7.5 overall."#;
        let c = extract_fields(raw).unwrap();
        assert_eq!(c.scores, ScoreBreakdown::new(3.2, 2.5, 1.8));
        assert_eq!(c.final_score, 7.5);
        assert_eq!(c.recommendation, "prioritize_now");
    }

    #[test]
    fn extraction_requires_strategic_fit() {
        let raw = r#""mission_alignment": 3.2, "anti_challenge": 2.5, "final_score": 7.5"#;
        assert!(extract_fields(raw).is_none());
    }

    #[test]
    fn extraction_keeps_partial_explanations_and_label() {
        let raw = r#"mission_alignment = 2, anti_challenge = 1.5, strategic_fit = 1,
            final_score = 4.5, recommendation: Consider Later
            "mission": "Loosely related to the \"core\" goal"
            "#;
        let c = extract_fields(raw).unwrap();
        assert_eq!(c.recommendation, "Consider Later");
        assert_eq!(c.explanations.len(), 1);
        assert_eq!(c.explanations["mission"], r#"Loosely related to the "core" goal"#);
    }

    #[test]
    fn extraction_ignores_unrecognised_label() {
        let raw = "mission_alignment: 3, anti_challenge: 3, strategic_fit: 1, final_score: 6.5\n\
                   My recommendation: you should start small";
        let c = extract_fields(raw).unwrap();
        assert_eq!(c.recommendation, "good_alignment");
    }

    #[test]
    fn extraction_keeps_negative_values_for_validation() {
        let raw = "mission_alignment: -1, anti_challenge: 1, strategic_fit: 1, final_score: 1";
        let c = extract_fields(raw).unwrap();
        assert_eq!(c.scores.mission_alignment, -1.0);
    }
}
