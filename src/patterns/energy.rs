//! Tone matching: classify how the user is talking and rewrite questions to fit.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INTENSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fuck\w*|shit\w*|damn|hell|crap|asap|urgent\w*|right now|immediately|emergency)\b|!{2,}")
        .expect("intense pattern is valid")
});

static CASUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(lol|lmao|haha\w*|idk|tbh|kinda|sorta|yeah|yep|nah|dunno|gonna|wanna|like,)")
        .expect("casual pattern is valid")
});

static FORMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(however|therefore|furthermore|moreover|consequently|nevertheless|regarding|additionally)\b")
        .expect("formal pattern is valid")
});

static HEDGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(i wonder if|i'm curious|maybe|perhaps|kind of|sort of|possibly|just)\s+")
        .expect("hedge pattern is valid")
});

/// Modal swaps applied for intense tone.
const INTENSE_MODALS: &[(&str, &str)] = &[
    ("could", "can"),
    ("might", "will"),
    ("would", "will"),
];

/// Average word length above which plain text reads as formal.
const FORMAL_WORD_LENGTH: f64 = 6.0;

/// Detected tone of a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Intense,
    Casual,
    Formal,
    Direct,
}

/// Detected intensity of a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

/// Tone + intensity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Energy {
    pub tone: Tone,
    pub intensity: Intensity,
}

impl Default for Energy {
    fn default() -> Self {
        Self {
            tone: Tone::Direct,
            intensity: Intensity::Medium,
        }
    }
}

fn is_shouting(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 8 {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters.len() as f64 > 0.6
}

fn average_word_length(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let letters: usize = words
        .iter()
        .map(|w| w.chars().filter(|c| c.is_alphabetic()).count())
        .sum();
    letters as f64 / words.len() as f64
}

/// Classify the user's tone.
pub fn match_energy(text: &str) -> Energy {
    if INTENSE.is_match(text) || is_shouting(text) {
        return Energy {
            tone: Tone::Intense,
            intensity: Intensity::High,
        };
    }

    if CASUAL.is_match(text) {
        return Energy {
            tone: Tone::Casual,
            intensity: Intensity::Low,
        };
    }

    if FORMAL.is_match(text) || average_word_length(text) > FORMAL_WORD_LENGTH {
        return Energy {
            tone: Tone::Formal,
            intensity: Intensity::Medium,
        };
    }

    Energy::default()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        // Keep "I" and acronyms intact.
        Some(first) if chars.clone().next().is_some_and(|c| c.is_uppercase()) => {
            std::iter::once(first).chain(chars).collect()
        }
        Some('I') if text.starts_with("I ") || text.starts_with("I'") => text.to_string(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn swap_modals(question: &str) -> String {
    question
        .split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            INTENSE_MODALS
                .iter()
                .find(|(from, _)| lower == *from)
                .map(|(_, to)| {
                    if word.starts_with(char::is_uppercase) {
                        capitalize_first(to)
                    } else {
                        (*to).to_string()
                    }
                })
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite a question to match the user's energy. Textual only.
pub fn adjust_question_energy(question: &str, energy: Energy) -> String {
    let question = question.trim();
    match energy.tone {
        Tone::Direct => {
            let stripped = HEDGES.replace_all(question, "");
            capitalize_first(stripped.trim())
        }
        Tone::Casual => {
            if question.to_lowercase().starts_with("so,") || question.is_empty() {
                question.to_string()
            } else {
                format!("So, {}", lowercase_first(question))
            }
        }
        Tone::Intense => swap_modals(question),
        Tone::Formal => question.to_string(),
    }
}
