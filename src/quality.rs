//! Quality metrics derived from analysis results.
//!
//! [`QualityTracker`] is an explicitly constructed object; share it with an
//! `Arc` where several call sites should aggregate into the same records.

use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use serde::Serialize;

use crate::text;
use crate::types::{AnalysisResult, MAX_FINAL_SCORE};

/// Completeness weights: non-zero sub-scores, explanations, non-zero final score.
const SUBSCORE_WEIGHT: f64 = 0.4;
const EXPLANATION_WEIGHT: f64 = 0.3;
const FINAL_SCORE_WEIGHT: f64 = 0.3;

/// Explanation length (chars) at which the length signal saturates.
const CONFIDENT_LENGTH: f64 = 500.0;
const BASE_CONFIDENCE: f64 = 0.3;
const HEDGE_PENALTY: f64 = 0.1;
const MAX_HEDGE_PENALTY: f64 = 0.5;

/// Qualifiers that lower confidence.
const HEDGE_WORDS: &[&str] = &[
    "might",
    "maybe",
    "perhaps",
    "possibly",
    "probably",
    "unclear",
    "uncertain",
    "unsure",
    "likely",
    "seems",
    "could",
];

/// Quality of one result; every value is in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub completeness: f64,
    pub consistency: f64,
    pub confidence: f64,
}

impl QualityMetrics {
    /// Derive metrics from `result`.
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            completeness: completeness(result),
            consistency: consistency(result),
            confidence: confidence(result),
        }
    }
}

fn completeness(result: &AnalysisResult) -> f64 {
    let scores = &result.scores;
    let mut score = 0.0;
    if scores.mission_alignment > 0.0 || scores.anti_challenge > 0.0 || scores.strategic_fit > 0.0
    {
        score += SUBSCORE_WEIGHT;
    }
    if result.explanations.values().any(|e| !e.trim().is_empty()) {
        score += EXPLANATION_WEIGHT;
    }
    if result.final_score > 0.0 {
        score += FINAL_SCORE_WEIGHT;
    }
    score
}

fn consistency(result: &AnalysisResult) -> f64 {
    let gap = (result.final_score - result.scores.total()).abs();
    (1.0 - gap / MAX_FINAL_SCORE).clamp(0.0, 1.0)
}

fn confidence(result: &AnalysisResult) -> f64 {
    let length: usize = result
        .explanations
        .values()
        .map(|e| e.trim().chars().count())
        .sum();
    let hedges: usize = result
        .explanations
        .values()
        .map(|e| {
            text::normalize(e)
                .split(' ')
                .filter(|word| HEDGE_WORDS.contains(word))
                .count()
        })
        .sum();

    let length_signal = (length as f64 / CONFIDENT_LENGTH).min(1.0);
    let penalty = (hedges as f64 * HEDGE_PENALTY).min(MAX_HEDGE_PENALTY);
    (BASE_CONFIDENCE + (1.0 - BASE_CONFIDENCE) * length_signal - penalty).clamp(0.0, 1.0)
}

/// A recorded measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityRecord {
    pub metrics: QualityMetrics,
    pub recorded_at: SystemTime,
}

/// Append-only log of quality measurements.
#[derive(Debug, Default)]
pub struct QualityTracker {
    records: RwLock<Vec<QualityRecord>>,
}

impl QualityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure `result` and append the measurement.
    pub fn record(&self, result: &AnalysisResult) -> QualityMetrics {
        let metrics = QualityMetrics::from_result(result);
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(QualityRecord {
                metrics,
                recorded_at: SystemTime::now(),
            });
        metrics
    }

    /// Mean of every metric across all records; all zero when empty.
    pub fn average(&self) -> QualityMetrics {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        if records.is_empty() {
            return QualityMetrics::default();
        }
        let n = records.len() as f64;
        let sum = records.iter().fold(QualityMetrics::default(), |acc, r| QualityMetrics {
            completeness: acc.completeness + r.metrics.completeness,
            consistency: acc.consistency + r.metrics.consistency,
            confidence: acc.confidence + r.metrics.confidence,
        });
        QualityMetrics {
            completeness: sum.completeness / n,
            consistency: sum.consistency / n,
            confidence: sum.confidence / n,
        }
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<QualityRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
