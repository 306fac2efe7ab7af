//! Analysis result types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound of [`ScoreBreakdown::mission_alignment`].
pub const MAX_MISSION_ALIGNMENT: f64 = 4.0;
/// Upper bound of [`ScoreBreakdown::anti_challenge`].
pub const MAX_ANTI_CHALLENGE: f64 = 3.5;
/// Upper bound of [`ScoreBreakdown::strategic_fit`].
pub const MAX_STRATEGIC_FIT: f64 = 2.5;
/// Upper bound of the final score.
pub const MAX_FINAL_SCORE: f64 = 10.0;

/// The three bounded sub-scores.
///
/// The final score is reported separately and need not equal their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// How well the idea serves the caller's goals, in `[0, 4.0]`.
    pub mission_alignment: f64,
    /// How well the idea avoids known distractions, in `[0, 3.5]`.
    pub anti_challenge: f64,
    /// Strategic leverage, in `[0, 2.5]`.
    pub strategic_fit: f64,
}

impl ScoreBreakdown {
    pub fn new(mission_alignment: f64, anti_challenge: f64, strategic_fit: f64) -> Self {
        Self {
            mission_alignment,
            anti_challenge,
            strategic_fit,
        }
    }

    /// Sum of the three sub-scores.
    pub fn total(&self) -> f64 {
        self.mission_alignment + self.anti_challenge + self.strategic_fit
    }
}

/// Recommendation label. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    PrioritizeNow,
    GoodAlignment,
    ConsiderLater,
    Avoid,
}

impl Recommendation {
    pub const ALL: [Recommendation; 4] = [
        Recommendation::PrioritizeNow,
        Recommendation::GoodAlignment,
        Recommendation::ConsiderLater,
        Recommendation::Avoid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::PrioritizeNow => "prioritize_now",
            Recommendation::GoodAlignment => "good_alignment",
            Recommendation::ConsiderLater => "consider_later",
            Recommendation::Avoid => "avoid",
        }
    }

    /// Parse a loosely formatted label.
    ///
    /// Case, surrounding decoration and the separator style (`_`, `-`,
    /// space) are ignored, so `"🔥 PRIORITIZE NOW"` and `"prioritize-now"`
    /// both parse.
    pub fn from_label(label: &str) -> Option<Self> {
        let canonical = label
            .trim()
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == canonical)
    }

    /// Label implied by a final score.
    pub fn for_score(final_score: f64) -> Self {
        if final_score >= 7.5 {
            Recommendation::PrioritizeNow
        } else if final_score >= 6.0 {
            Recommendation::GoodAlignment
        } else if final_score >= 4.0 {
            Recommendation::ConsiderLater
        } else {
            Recommendation::Avoid
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage reported by a hosted backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Structured analysis produced by a backend.
///
/// Immutable once produced. Callers that need a variant (for example the
/// cached wrapper flipping [`from_cache`](Self::from_cache)) clone it first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub scores: ScoreBreakdown,
    pub final_score: f64,
    pub recommendation: Recommendation,
    /// Explanation category → text. Always present, possibly empty.
    pub explanations: BTreeMap<String, String>,
    /// Name of the backend that produced this result.
    pub provider: String,
    /// Wall-clock duration of the producing call.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
