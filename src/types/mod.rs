//! Public types for the Mimir API.

mod request;
mod result;

pub use request::{AnalysisContext, AnalysisRequest};
pub use result::{
    AnalysisResult, MAX_ANTI_CHALLENGE, MAX_FINAL_SCORE, MAX_MISSION_ALIGNMENT, MAX_STRATEGIC_FIT,
    Recommendation, ScoreBreakdown, TokenUsage,
};
