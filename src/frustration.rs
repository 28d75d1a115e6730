//! Frustration and skip detection over raw user text.
//!
//! Pure classifiers with no state. A skip request or high frustration tells the
//! stage engine to stop asking and synthesize immediately.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Regexes signalling annoyance with the questioning itself.
static FRUSTRATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(stop|quit|enough)\s+(asking|with the questions)\b",
        r"(?i)\btoo many questions\b",
        r"(?i)\bjust\s+(tell|give|show)\s+me\b",
        r"(?i)\bwhat'?s the point\b",
        r"(?i)\b(ugh+|argh+|fml)\b",
        r"(?i)\b(annoying|frustrat\w*|irritat\w*|pointless|useless)\b",
        r"(?i)\bi already (said|told you|answered)\b",
        r"(?i)\b(wtf|damn it|dammit)\b",
        r"(?i)\bthis isn'?t (helping|working)\b",
        r"(?i)\bhow many more\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("frustration pattern is valid"))
    .collect()
});

/// Phrases asking to skip the questions and get the answer now.
static SKIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bjust\s+(tell|give|show)\s+me\b",
        r"(?i)\b(skip|skip it|skip this|skip ahead)\b",
        r"(?i)\bget to the (point|answer|insight)\b",
        r"(?i)\b(what'?s|give me) the (answer|breakthrough|insight)\b",
        r"(?i)\bcut to the chase\b",
        r"(?i)\b(answer|insight|breakthrough) now\b",
        r"(?i)\bno more questions\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("skip pattern is valid"))
    .collect()
});

/// Coarse frustration level from the number of matched patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustrationLevel {
    None,
    Mild,
    High,
}

impl FrustrationLevel {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrustrationLevel::None => "none",
            FrustrationLevel::Mild => "mild",
            FrustrationLevel::High => "high",
        }
    }
}

impl std::fmt::Display for FrustrationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn count_matches(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

/// True if any frustration pattern matches.
pub fn is_user_frustrated(text: &str) -> bool {
    FRUSTRATION_PATTERNS.iter().any(|re| re.is_match(text))
}

/// True if the user explicitly asks to skip to the answer.
pub fn wants_to_skip(text: &str) -> bool {
    SKIP_PATTERNS.iter().any(|re| re.is_match(text))
}

/// 0 matches is none, 1 is mild, 2 or more is high.
pub fn detect_frustration_level(text: &str) -> FrustrationLevel {
    match count_matches(&FRUSTRATION_PATTERNS, text) {
        0 => FrustrationLevel::None,
        1 => FrustrationLevel::Mild,
        _ => FrustrationLevel::High,
    }
}

/// Skip request or high frustration: stop asking regardless of question count.
pub fn should_short_circuit(text: &str) -> bool {
    wants_to_skip(text) || detect_frustration_level(text) == FrustrationLevel::High
}
