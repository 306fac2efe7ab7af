//! Text normalization, tokenization and Jaccard similarity.
//!
//! Used by the similarity cache to recognise paraphrased submissions of the
//! same idea. All three functions are pure.

use std::collections::HashSet;

/// Words dropped by [`tokenize()`].
const STOPWORDS: &[&str] = &[
    "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "if", "in", "into", "is", "it", "its", "just", "me", "my", "no", "not",
    "of", "on", "or", "our", "out", "over", "she", "should", "so", "some", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "to", "up", "us", "was",
    "we", "were", "what", "when", "which", "who", "will", "with", "would", "you", "your",
];

/// Canonical form of `text`.
///
/// Lowercases, drops every character that is neither alphanumeric nor
/// whitespace, and collapses whitespace runs to a single space.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered content tokens of `text`.
///
/// Normalizes first, then drops stopwords and single-character tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| t.chars().count() > 1 && !STOPWORDS.contains(t))
        .map(str::to_owned)
        .collect()
}

/// Distinct tokens of `text`.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard similarity of the token sets of two texts, in `[0, 1]`.
///
/// Two texts with no content tokens are identical (1.0); exactly one empty
/// side scores 0.0.
pub fn similarity(text1: &str, text2: &str) -> f64 {
    jaccard(&token_set(text1), &token_set(text2))
}

/// Jaccard index of two precomputed token sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
