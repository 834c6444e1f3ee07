//! Task classification
//!
//! Turns request text into a [`TaskClassification`]: a complexity tier plus an
//! orthogonal "code" tag. Classification is pure, synchronous and total.
//!
//! Every signal is a substring occurrence count over the lowercased, trimmed
//! text, so extending a request can only keep or raise its tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Complexity tiers, totally ordered from cheapest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskTier {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl TaskTier {
    pub const ALL: [TaskTier; 5] = [
        TaskTier::Trivial,
        TaskTier::Simple,
        TaskTier::Moderate,
        TaskTier::Complex,
        TaskTier::Expert,
    ];

    fn from_score(score: u32) -> Self {
        match score {
            0 => TaskTier::Trivial,
            1..=2 => TaskTier::Simple,
            3..=4 => TaskTier::Moderate,
            5..=6 => TaskTier::Complex,
            _ => TaskTier::Expert,
        }
    }
}

impl fmt::Display for TaskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskTier::Trivial => "trivial",
            TaskTier::Simple => "simple",
            TaskTier::Moderate => "moderate",
            TaskTier::Complex => "complex",
            TaskTier::Expert => "expert",
        };
        f.write_str(name)
    }
}

/// Flattened task type: the tier, or `Code` when the code tag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Expert,
    Code,
}

/// Result of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskClassification {
    pub tier: TaskTier,
    pub is_code: bool,
    /// Heuristic confidence in [0.0, 1.0]; 0.0 for empty input
    pub confidence: f64,
}

impl TaskClassification {
    pub fn task_type(&self) -> TaskType {
        if self.is_code {
            return TaskType::Code;
        }
        match self.tier {
            TaskTier::Trivial => TaskType::Trivial,
            TaskTier::Simple => TaskType::Simple,
            TaskTier::Moderate => TaskType::Moderate,
            TaskTier::Complex => TaskType::Complex,
            TaskTier::Expert => TaskType::Expert,
        }
    }
}

/// Reserved for callers that wrap the classifier behind fallible interfaces.
/// [`classify`] itself never produces it.
#[derive(Debug, Error)]
#[error("classification failed: {0}")]
pub struct ClassificationError(pub String);

/// Markers of multi-step reasoning. Each occurrence scores one point.
const REASONING_MARKERS: &[&str] = &[
    "step by step",
    "first",
    "then",
    "finally",
    "compare",
    "analyze",
    "analyse",
    "explain why",
    "trade-off",
    "tradeoff",
    "pros and cons",
    "design",
    "plan",
    "evaluate",
    "optimiz",
];

/// Markers of expert-level work. Each occurrence scores two points.
const EXPERT_MARKERS: &[&str] = &[
    "architecture",
    "distributed",
    "concurren",
    "formal proof",
    "prove that",
    "security audit",
    "threat model",
    "from scratch",
    "migration plan",
];

const CODE_MARKERS: &[&str] = &[
    "```",
    "fn ",
    "def ",
    "class ",
    "function",
    "impl ",
    "#include",
    "import ",
    "compile",
    "stack trace",
    "traceback",
    "refactor",
    "unit test",
    "regex",
    "sql",
    "bug",
    "debug",
    "git ",
    "dockerfile",
    ".rs",
    ".py",
    ".ts",
    ".js",
];

const MAX_REASONING_POINTS: u32 = 4;
const MAX_EXPERT_POINTS: u32 = 4;

/// Character-count bands; each band crossed adds one point.
const LENGTH_BANDS: &[usize] = &[20, 80, 200, 600];

fn occurrences(haystack: &str, markers: &[&str]) -> u32 {
    markers
        .iter()
        .map(|marker| haystack.matches(marker).count() as u32)
        .sum()
}

/// Classify request text.
///
/// # Examples
///
/// ```
/// use gatekeeper::classifier::{classify, TaskTier};
///
/// let c = classify("   ");
/// assert_eq!(c.tier, TaskTier::Trivial);
/// assert_eq!(c.confidence, 0.0);
///
/// let c = classify("Fix the bug in parser.rs where the lexer panics");
/// assert!(c.is_code);
/// ```
pub fn classify(text: &str) -> TaskClassification {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return TaskClassification {
            tier: TaskTier::Trivial,
            is_code: false,
            confidence: 0.0,
        };
    }

    let lowered = trimmed.to_lowercase();
    let chars = trimmed.chars().count();

    let length_points = LENGTH_BANDS.iter().filter(|band| chars >= **band).count() as u32;
    let reasoning_points = occurrences(&lowered, REASONING_MARKERS).min(MAX_REASONING_POINTS);
    let expert_points = (occurrences(&lowered, EXPERT_MARKERS) * 2).min(MAX_EXPERT_POINTS);
    let code_hits = occurrences(&lowered, CODE_MARKERS);

    let score = length_points + reasoning_points + expert_points;
    let tier = TaskTier::from_score(score);

    // More independent evidence means more confidence, never reaching 1.0.
    let signals = reasoning_points + expert_points + code_hits.min(3);
    let confidence = (0.5 + 0.05 * f64::from(signals.min(9))).min(0.95);

    TaskClassification {
        tier,
        is_code: code_hits > 0,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_is_trivial_with_zero_confidence() {
        for input in ["", " ", "\n\t  "] {
            let c = classify(input);
            assert_eq!(c.tier, TaskTier::Trivial);
            assert!(!c.is_code);
            assert_eq!(c.confidence, 0.0);
        }
    }

    #[test]
    fn short_greeting_is_trivial() {
        let c = classify("hi there");
        assert_eq!(c.tier, TaskTier::Trivial);
        assert_eq!(c.task_type(), TaskType::Trivial);
    }

    #[test]
    fn short_question_is_simple() {
        let c = classify("What is the capital city of Portugal?");
        assert_eq!(c.tier, TaskTier::Simple);
    }

    #[test]
    fn multi_step_request_is_at_least_moderate() {
        let c = classify(
            "First collect the quarterly numbers, then compare them with last year, \
             and finally explain why revenue dropped.",
        );
        assert!(c.tier >= TaskTier::Moderate, "got {:?}", c.tier);
    }

    #[test]
    fn architecture_request_is_expert() {
        let c = classify(
            "Design the architecture for a distributed job scheduler from scratch. \
             First analyze the concurrency requirements, then compare leader election \
             approaches, and finally write a migration plan with the trade-offs.",
        );
        assert_eq!(c.tier, TaskTier::Expert);
    }

    #[test]
    fn code_tag_is_orthogonal_to_tier() {
        let short = classify("fix this regex");
        assert!(short.is_code);
        assert_eq!(short.task_type(), TaskType::Code);
        assert!(short.tier <= TaskTier::Simple);

        let long = classify(
            "Refactor the distributed cache module: first analyze the concurrency bugs, \
             then design a lock-free replacement and finally add a unit test suite.",
        );
        assert!(long.is_code);
        assert!(long.tier >= TaskTier::Complex);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "Compare two sorting algorithms and explain why one is faster";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn tiers_are_totally_ordered() {
        for pair in TaskTier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn confidence_stays_below_one() {
        let c = classify(&"design the distributed architecture then compare ".repeat(50));
        assert!(c.confidence <= 0.95);
        assert!(c.confidence > 0.5);
    }

    proptest! {
        #[test]
        fn extending_text_never_lowers_tier(prefix in ".{0,300}", suffix in ".{0,300}") {
            let base = classify(&prefix);
            let extended = classify(&format!("{prefix}{suffix}"));
            prop_assert!(extended.tier >= base.tier);
            prop_assert!(!base.is_code || extended.is_code);
        }

        #[test]
        fn never_panics_and_confidence_in_range(text in "\\PC*") {
            let c = classify(&text);
            prop_assert!((0.0..=1.0).contains(&c.confidence));
        }
    }
}
