//! Heuristic text categorizer: a deliberate stand-in for a zero-shot
//! pipeline.
//!
//! Scores come from a keyword -> label-substring affinity table plus a
//! small random base, capped below 1.0 so the lab never claims certainty.
//! It simulates semantic understanding rather than performing it; the real
//! embedding-based classifier is a separate, optional capability.

use rand::Rng;
use serde::Serialize;

/// Keyword found in the text, label substrings it relates to, and the boost
/// applied when both sides match.
const AFFINITIES: &[(&str, &[&str], f64)] = &[
    ("uber", &["transp", "viaje"], 0.8),
    ("foods", &["comid", "super"], 0.75),
    ("netflix", &["suscr", "ocio"], 0.9),
    ("tesla", &["energ", "transp", "lujo"], 0.7),
    ("apple", &["tecn", "suscr"], 0.6),
];

const SCORE_CAP: f64 = 0.99;
const BASE_NOISE: f64 = 0.2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Score `text` against every label, sorted descending. Ties keep the
/// original label order (stable sort).
pub fn classify(text: &str, labels: &[String], rng: &mut impl Rng) -> Vec<LabelScore> {
    let lower_text = text.to_lowercase();
    let mut scores: Vec<LabelScore> = labels
        .iter()
        .map(|label| {
            let lower_label = label.to_lowercase();
            let mut boost: f64 = 0.0;
            for (keyword, substrings, value) in AFFINITIES {
                if lower_text.contains(keyword) && substrings.iter().any(|s| lower_label.contains(s)) {
                    boost = boost.max(*value);
                }
            }
            let base = rng.gen::<f64>() * BASE_NOISE;
            LabelScore { label: label.clone(), score: (base + boost).min(SCORE_CAP) }
        })
        .collect();
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

/// The user-editable label set plus the scores cached from the last analysis.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: Vec<String>,
    scores: Vec<LabelScore>,
}

impl LabelSet {
    pub fn new(initial: &[&str]) -> Self {
        Self { labels: initial.iter().map(|s| s.to_string()).collect(), scores: Vec::new() }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn scores(&self) -> &[LabelScore] {
        &self.scores
    }

    /// Add a label; duplicates and blank input are ignored.
    pub fn add(&mut self, label: &str) -> bool {
        let trimmed = label.trim();
        if trimmed.is_empty() || self.labels.iter().any(|l| l == trimmed) {
            return false;
        }
        self.labels.push(trimmed.to_string());
        true
    }

    /// Remove a label and discard any cached score for it. Removing a label
    /// that never scored is fine.
    pub fn remove(&mut self, label: &str) {
        self.labels.retain(|l| l != label);
        self.scores.retain(|s| s.label != label);
    }

    pub fn can_analyze(&self) -> bool {
        !self.labels.is_empty()
    }

    /// Run the heuristic classifier and cache the result. With an empty
    /// label set this is a disabled action: state stays untouched.
    pub fn analyze(&mut self, text: &str, rng: &mut impl Rng) -> &[LabelScore] {
        if self.can_analyze() {
            self.scores = classify(text, &self.labels, rng);
        }
        &self.scores
    }

    /// New input invalidates the cached scores.
    pub fn clear_scores(&mut self) {
        self.scores.clear();
    }
}
