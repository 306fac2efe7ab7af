//! Analysis request and caller context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Caller-supplied goal context.
///
/// Opaque to the resilience layer: backends only render it into prompts,
/// and the rule-based scorer reads the goals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Goals or mission statements the idea is judged against.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Things the caller wants to avoid (distractions, anti-goals).
    #[serde(default)]
    pub avoid: Vec<String>,
    /// Free-form notes appended to prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a goal.
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    /// Add something to avoid.
    pub fn avoid(mut self, item: impl Into<String>) -> Self {
        self.avoid.push(item.into());
        self
    }

    /// Set free-form notes.
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One analysis call: the idea text plus the caller's context.
///
/// Cheap to clone; the context is shared.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    idea: String,
    context: Option<Arc<AnalysisContext>>,
}

impl AnalysisRequest {
    /// Create a request without context.
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            context: None,
        }
    }

    /// Attach the caller's context.
    pub fn with_context(mut self, context: Arc<AnalysisContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn context(&self) -> Option<&AnalysisContext> {
        self.context.as_deref()
    }
}
