//! Keyword-based complexity estimation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse complexity label for a micro-issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Data models and plain declarations.
    #[default]
    Simple,
    /// Behaviour and cross-component wiring.
    Medium,
    /// Algorithmic or performance-sensitive work.
    Complex,
}

impl Complexity {
    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }

    /// Returns the capitalised label used in issue bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Complexity::Simple => "Simple",
            Complexity::Medium => "Medium",
            Complexity::Complex => "Complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword groups in tie-break order: earlier groups win ties.
pub const COMPLEXITY_GROUPS: &[(Complexity, &[&str])] = &[
    (Complexity::Simple, &["class", "property", "model", "enum"]),
    (
        Complexity::Medium,
        &["method", "system", "integration", "collision"],
    ),
    (
        Complexity::Complex,
        &["algorithm", "physics", "optimization", "performance"],
    ),
];

/// Total substring occurrences of a group's keywords in already-lowercased text.
fn group_score(lowered: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .map(|keyword| lowered.matches(keyword).count())
        .sum()
}

/// Scores content against each keyword group, in group order.
pub fn score(content: &str) -> Vec<(Complexity, usize)> {
    let lowered = content.to_lowercase();
    COMPLEXITY_GROUPS
        .iter()
        .map(|(complexity, keywords)| (*complexity, group_score(&lowered, keywords)))
        .collect()
}

/// Estimates complexity from keyword counts.
///
/// The strictly highest group wins. No matches yields `Simple`; ties go to
/// the earliest group in `COMPLEXITY_GROUPS`.
pub fn estimate_complexity(content: &str) -> Complexity {
    let mut best = Complexity::Simple;
    let mut best_score = 0;

    for (complexity, group) in score(content) {
        if group > best_score {
            best = complexity;
            best_score = group;
        }
    }

    best
}
