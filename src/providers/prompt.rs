//! Prompt construction shared by the model-backed providers.

use std::fmt::Write;

use crate::types::{
    AnalysisRequest, MAX_ANTI_CHALLENGE, MAX_MISSION_ALIGNMENT, MAX_STRATEGIC_FIT, Recommendation,
};

/// System prompt describing the scoring rubric and answer schema.
pub fn system_prompt() -> String {
    let labels = Recommendation::ALL
        .iter()
        .map(Recommendation::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You evaluate ideas against a person's goals.\n\
         Score three dimensions:\n\
         - mission_alignment (0 to {MAX_MISSION_ALIGNMENT}): how directly the idea serves the goals\n\
         - anti_challenge (0 to {MAX_ANTI_CHALLENGE}): how well it avoids the listed distractions\n\
         - strategic_fit (0 to {MAX_STRATEGIC_FIT}): leverage, timing and feasibility\n\
         Give a final_score from 0 to 10 and one recommendation from: {labels}.\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"mission_alignment\": number, \"anti_challenge\": number, \"strategic_fit\": number, \
         \"final_score\": number, \"recommendation\": string, \
         \"explanations\": {{\"mission\": string, \"anti_challenge\": string, \"strategic\": string}}}}"
    )
}

/// User prompt carrying the idea and the caller's context.
pub fn user_prompt(request: &AnalysisRequest) -> String {
    let mut prompt = String::new();
    if let Some(context) = request.context() {
        if !context.goals.is_empty() {
            prompt.push_str("Goals:\n");
            for goal in &context.goals {
                let _ = writeln!(prompt, "- {goal}");
            }
        }
        if !context.avoid.is_empty() {
            prompt.push_str("Avoid:\n");
            for item in &context.avoid {
                let _ = writeln!(prompt, "- {item}");
            }
        }
        if let Some(notes) = &context.notes {
            let _ = writeln!(prompt, "Notes: {notes}");
        }
        prompt.push('\n');
    }
    let _ = write!(prompt, "Idea: {}", request.idea());
    prompt
}

/// Single prompt for backends without a separate system field.
pub fn combined_prompt(request: &AnalysisRequest) -> String {
    format!("{}\n\n{}", system_prompt(), user_prompt(request))
}
