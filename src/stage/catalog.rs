//! Behavioral pattern catalog and early pattern detection.

use serde::{Deserialize, Serialize};

/// Patterns kept after detection.
pub const MAX_DETECTED_PATTERNS: usize = 3;

const BASE_CONFIDENCE: f64 = 0.4;
const CONFIDENCE_PER_HIT: f64 = 0.15;
const MAX_CONFIDENCE: f64 = 0.95;

/// Static catalog entry: a named tension, its keywords and a canned insight.
///
/// A keyword matches a whole word or phrase. A trailing `*` marks a stem that
/// matches any word starting with it.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorPattern {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub insight: &'static str,
}

/// The behavioral pattern catalog.
pub const PATTERN_CATALOG: &[BehaviorPattern] = &[
    BehaviorPattern {
        name: "control-vs-chaos",
        keywords: &[
            "control*", "chaos", "chaotic", "overwhelm*", "uncertain*", "unpredictab*", "mess",
            "messy", "plan", "planning", "spiral*",
        ],
        insight: "You grip control hardest exactly where the chaos feels least survivable.",
    },
    BehaviorPattern {
        name: "security-vs-freedom",
        keywords: &[
            "secure", "security", "stable", "stability", "freedom", "free", "trapped", "escape",
            "risk*",
        ],
        insight: "The safety you built has become the cage you want to leave.",
    },
    BehaviorPattern {
        name: "belonging-vs-authenticity",
        keywords: &[
            "fit in", "belong*", "approval", "judg*", "pretend*", "mask", "real me", "reject*",
        ],
        insight: "You trade pieces of yourself for a seat at the table.",
    },
    BehaviorPattern {
        name: "achievement-vs-rest",
        keywords: &[
            "burnout", "burned out", "exhausted", "tired", "rest", "productive", "hustle",
            "deadline*", "overwork*",
        ],
        insight: "You only let yourself rest after earning it, and it is never earned.",
    },
    BehaviorPattern {
        name: "perfection-vs-progress",
        keywords: &[
            "perfect*", "mistake*", "good enough", "fail*", "procrastinat*", "not ready",
            "stupid",
        ],
        insight: "Waiting to be ready is how you avoid being judged unfinished.",
    },
    BehaviorPattern {
        name: "duty-vs-desire",
        keywords: &[
            "should", "have to", "supposed to", "obligat*", "guilt*", "expected", "let them down",
        ],
        insight: "The life you owe others keeps outbidding the life you want.",
    },
    BehaviorPattern {
        name: "connection-vs-independence",
        keywords: &[
            "alone", "lonely", "independen*", "relationship*", "distance", "depend*", "clingy",
            "my own space",
        ],
        insight: "You keep people at arm's length so needing them never costs you.",
    },
];

/// Lowercased words joined by single spaces, padded with a space on both
/// ends so keywords can be matched at word boundaries.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut normalized = String::with_capacity(lowered.len() + 2);
    normalized.push(' ');
    for word in lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
    {
        normalized.push_str(word);
        normalized.push(' ');
    }
    normalized
}

fn keyword_matches(normalized: &str, keyword: &str) -> bool {
    match keyword.strip_suffix('*') {
        Some(stem) => normalized.contains(&format!(" {}", stem)),
        None => normalized.contains(&format!(" {} ", keyword)),
    }
}

/// A detected instance of a catalog pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    /// Keywords that matched, in catalog order.
    pub evidence: Vec<String>,
    /// 0.0-1.0
    pub confidence: f64,
}

impl Pattern {
    /// The two competing sides: "control-vs-chaos" -> ("control", "chaos").
    pub fn sides(&self) -> (&str, &str) {
        self.name
            .split_once("-vs-")
            .unwrap_or((self.name.as_str(), "the alternative"))
    }

    /// Canned insight for this pattern, if it is a catalog entry.
    pub fn insight(&self) -> Option<&'static str> {
        find_pattern(&self.name).map(|p| p.insight)
    }
}

/// Look up a catalog entry by name.
pub fn find_pattern(name: &str) -> Option<&'static BehaviorPattern> {
    PATTERN_CATALOG.iter().find(|p| p.name == name)
}

/// `min(0.4 + 0.15 * hits, 0.95)`, rounded to two decimals.
pub fn pattern_confidence(hits: usize) -> f64 {
    let raw = (BASE_CONFIDENCE + CONFIDENCE_PER_HIT * hits as f64).min(MAX_CONFIDENCE);
    (raw * 100.0).round() / 100.0
}

/// Detect catalog patterns across the transcript so far.
///
/// History and the latest text are joined and case-folded; each catalog
/// keyword found at a word boundary counts as one hit. Patterns with no hits are dropped, the
/// rest are sorted by confidence (ties keep catalog order) and capped at three.
pub fn detect_patterns_early(latest: &str, history: &[String]) -> Vec<Pattern> {
    let mut transcript = history.join(" ");
    transcript.push(' ');
    transcript.push_str(latest);
    let transcript = normalize(&transcript);

    if transcript.trim().is_empty() {
        return Vec::new();
    }

    let mut detected: Vec<Pattern> = PATTERN_CATALOG
        .iter()
        .filter_map(|entry| {
            let evidence: Vec<String> = entry
                .keywords
                .iter()
                .filter(|k| keyword_matches(&transcript, k))
                .map(|k| k.trim_end_matches('*').to_string())
                .collect();
            if evidence.is_empty() {
                return None;
            }
            Some(Pattern {
                name: entry.name.to_string(),
                confidence: pattern_confidence(evidence.len()),
                evidence,
            })
        })
        .collect();

    // Stable sort keeps catalog order for equal confidence
    detected.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    detected.truncate(MAX_DETECTED_PATTERNS);
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_control_vs_chaos_two_hits() {
        let patterns = detect_patterns_early("I can't control anything, it's all chaos", &[]);
        let found = patterns
            .iter()
            .find(|p| p.name == "control-vs-chaos")
            .expect("control-vs-chaos detected");
        assert_eq!(found.confidence, 0.7);
        assert_eq!(found.evidence, vec!["control", "chaos"]);
    }

    #[test]
    fn test_keywords_match_at_word_boundaries() {
        // "explain", "message" and "interested" hide plan, mess and rest
        let patterns =
            detect_patterns_early("Let me explain the message, I'm interested", &[]);
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_related_keywords_counted_once_per_word() {
        let patterns = detect_patterns_early("I want freedom", &[]);
        assert_eq!(patterns[0].name, "security-vs-freedom");
        assert_eq!(patterns[0].evidence, vec!["freedom"]);
        assert_eq!(patterns[0].confidence, 0.55);

        let patterns = detect_patterns_early("I'm fiercely independent", &[]);
        assert_eq!(patterns[0].evidence, vec!["independen"]);
    }

    #[test]
    fn test_stems_and_phrases() {
        let patterns = detect_patterns_early("I keep procrastinating, it never feels good enough", &[]);
        assert_eq!(patterns[0].name, "perfection-vs-progress");
        assert_eq!(patterns[0].evidence, vec!["good enough", "procrastinat"]);
    }

    #[test]
    fn test_single_hit_confidence() {
        assert_eq!(pattern_confidence(1), 0.55);
        assert_eq!(pattern_confidence(0), 0.4);
    }

    #[test]
    fn test_confidence_capped() {
        assert_eq!(pattern_confidence(4), 0.95);
        assert_eq!(pattern_confidence(100), 0.95);
    }

    #[test]
    fn test_empty_input_yields_no_patterns() {
        assert!(detect_patterns_early("", &[]).is_empty());
        assert!(detect_patterns_early("   ", &["".to_string()]).is_empty());
    }

    #[test]
    fn test_no_keywords_yields_no_patterns() {
        assert!(detect_patterns_early("The weather is nice today", &[]).is_empty());
    }

    #[test]
    fn test_history_is_included() {
        let history = vec!["I feel so trapped at my job".to_string()];
        let patterns = detect_patterns_early("but it pays well and it's stable", &history);
        assert_eq!(patterns[0].name, "security-vs-freedom");
        assert_eq!(patterns[0].confidence, 0.7);
    }

    #[test]
    fn test_sorted_and_capped_at_three() {
        let text = "I should rest but I'm exhausted and tired, I feel alone, \
                    I can't control the chaos, I'm trapped, I pretend to fit in";
        let patterns = detect_patterns_early(text, &[]);
        assert_eq!(patterns.len(), MAX_DETECTED_PATTERNS);
        assert_eq!(patterns[0].name, "achievement-vs-rest");
        assert!(patterns
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_catalog_insight_lookup() {
        let pattern = Pattern {
            name: "duty-vs-desire".to_string(),
            evidence: vec!["should".to_string()],
            confidence: 0.55,
        };
        assert!(pattern.insight().is_some());
        assert_eq!(pattern.sides(), ("duty", "desire"));
        assert!(find_pattern("nonexistent").is_none());
    }

    proptest! {
        #[test]
        fn prop_confidence_never_exceeds_cap(hits in 0usize..1000) {
            let c = pattern_confidence(hits);
            prop_assert!(c <= 0.95);
            prop_assert!(c >= 0.4);
        }

        #[test]
        fn prop_detection_bounded(text in ".{0,200}") {
            let patterns = detect_patterns_early(&text, &[]);
            prop_assert!(patterns.len() <= MAX_DETECTED_PATTERNS);
            for p in &patterns {
                prop_assert!(p.confidence <= 0.95);
                prop_assert!(!p.evidence.is_empty());
            }
        }
    }
}
