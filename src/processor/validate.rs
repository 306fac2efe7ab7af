//! Bounds checking for parsed analyses.

use std::collections::BTreeMap;

use crate::types::{
    MAX_ANTI_CHALLENGE, MAX_FINAL_SCORE, MAX_MISSION_ALIGNMENT, MAX_STRATEGIC_FIT, Recommendation,
    ScoreBreakdown,
};

use super::ParsedAnalysis;

/// Why a parsed analysis was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} = {value} is outside [0, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("unknown recommendation label: {0:?}")]
    UnknownRecommendation(String),
}

/// An analysis as read from backend output, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub scores: ScoreBreakdown,
    pub final_score: f64,
    /// Raw label as written by the backend.
    pub recommendation: String,
    pub explanations: BTreeMap<String, String>,
}

/// Check every bound and resolve the recommendation label.
pub fn validate(candidate: Candidate) -> Result<ParsedAnalysis, ValidationError> {
    let Candidate {
        scores,
        final_score,
        recommendation,
        explanations,
    } = candidate;

    check("mission_alignment", scores.mission_alignment, MAX_MISSION_ALIGNMENT)?;
    check("anti_challenge", scores.anti_challenge, MAX_ANTI_CHALLENGE)?;
    check("strategic_fit", scores.strategic_fit, MAX_STRATEGIC_FIT)?;
    check("final_score", final_score, MAX_FINAL_SCORE)?;

    let recommendation = Recommendation::from_label(&recommendation)
        .ok_or(ValidationError::UnknownRecommendation(recommendation))?;

    Ok(ParsedAnalysis {
        scores,
        final_score,
        recommendation,
        explanations,
    })
}

fn check(field: &'static str, value: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons, so test for the valid range.
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value, max })
    }
}
