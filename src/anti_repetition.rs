//! Anti-repetition engine for generated questions.
//!
//! Keeps a bounded history of asked questions and rejects candidates that
//! open the same way, share a structural fingerprint, or reuse a start word
//! too often within the comparison window.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::config::AntiRepetitionConfig;
use crate::patterns::QuestionCategory;

/// Words replaced by a placeholder when fingerprinting.
const STOPWORDS: &[&str] = &["you", "your", "that", "this", "it", "the", "a", "an"];

const PLACEHOLDER: &str = "xxx";

/// Fingerprint length in words.
const FINGERPRINT_WORDS: usize = 5;

/// Start-word repeats within the window that count as repetitive.
const START_WORD_LIMIT: usize = 2;

/// One asked question as remembered by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRecord {
    pub text: String,
    pub fingerprint: String,
    pub start_word: String,
    pub opening: String,
    pub category: Option<QuestionCategory>,
}

impl QuestionRecord {
    fn new(text: &str, category: Option<QuestionCategory>) -> Self {
        Self {
            text: text.to_string(),
            fingerprint: fingerprint(text),
            start_word: start_word(text),
            opening: opening(text),
            category,
        }
    }
}

/// Lowercased first word, or empty for blank text.
pub fn start_word(text: &str) -> String {
    text.split_whitespace()
        .next()
        .map(|w| w.to_lowercase())
        .unwrap_or_default()
}

/// Structural fingerprint: stopwords become a placeholder, non-letters are
/// stripped, words of two letters or fewer are dropped, first five joined by `-`.
pub fn fingerprint(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            let bare: String = word.chars().filter(|c| c.is_alphabetic() || *c == '\'').collect();
            if STOPWORDS.contains(&bare.as_str()) {
                PLACEHOLDER.to_string()
            } else {
                bare.chars().filter(|c| c.is_alphabetic()).collect()
            }
        })
        .filter(|w| w.chars().count() > 2)
        .take(FINGERPRINT_WORDS)
        .collect::<Vec<_>>()
        .join("-")
}

/// Case-folded opening words.
///
/// Normally the first three words. A question of exactly three words is
/// compared on its first two, since the third is its whole payload.
pub fn opening(text: &str) -> String {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.to_lowercase()
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_string()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let take = if words.len() == 3 { 2 } else { 3 };

    words.into_iter().take(take).collect::<Vec<_>>().join(" ")
}

/// Bounded question history with start-word accounting.
#[derive(Debug, Clone)]
pub struct AntiRepetitionEngine {
    history: VecDeque<QuestionRecord>,
    start_word_counts: HashMap<String, usize>,
    total_recorded: usize,
    config: AntiRepetitionConfig,
}

impl Default for AntiRepetitionEngine {
    fn default() -> Self {
        Self::new(AntiRepetitionConfig::default())
    }
}

impl AntiRepetitionEngine {
    /// Create an empty engine.
    pub fn new(config: AntiRepetitionConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_size),
            start_word_counts: HashMap::new(),
            total_recorded: 0,
            config,
        }
    }

    fn window(&self) -> impl Iterator<Item = &QuestionRecord> {
        let skip = self.history.len().saturating_sub(self.config.compare_window);
        self.history.iter().skip(skip)
    }

    /// True if the candidate repeats a recent question's shape.
    pub fn is_too_similar(&self, question: &str) -> bool {
        let candidate = QuestionRecord::new(question, None);

        let start_repeats = self
            .window()
            .filter(|r| !candidate.start_word.is_empty() && r.start_word == candidate.start_word)
            .count();
        if start_repeats >= START_WORD_LIMIT {
            debug!(start_word = %candidate.start_word, "Rejecting question: start word overused");
            return true;
        }

        if !candidate.fingerprint.is_empty()
            && self.window().any(|r| r.fingerprint == candidate.fingerprint)
        {
            debug!(fingerprint = %candidate.fingerprint, "Rejecting question: same structure");
            return true;
        }

        if !candidate.opening.is_empty() && self.window().any(|r| r.opening == candidate.opening) {
            debug!(opening = %candidate.opening, "Rejecting question: same opening");
            return true;
        }

        false
    }

    /// Remember an asked question, evicting the oldest past capacity.
    pub fn record(&mut self, question: &str, category: Option<QuestionCategory>) {
        let record = QuestionRecord::new(question, category);
        *self
            .start_word_counts
            .entry(record.start_word.clone())
            .or_insert(0) += 1;
        self.history.push_back(record);
        self.total_recorded += 1;

        while self.history.len() > self.config.history_size {
            if let Some(evicted) = self.history.pop_front() {
                if let Some(count) = self.start_word_counts.get_mut(&evicted.start_word) {
                    *count -= 1;
                    if *count == 0 {
                        self.start_word_counts.remove(&evicted.start_word);
                    }
                }
            }
        }
    }

    /// Unique categories over recorded questions, 1.0 when nothing is recorded.
    pub fn diversity_score(&self) -> f64 {
        if self.history.is_empty() {
            return 1.0;
        }
        let unique: HashSet<_> = self.history.iter().filter_map(|r| r.category).collect();
        unique.len() as f64 / self.history.len() as f64
    }

    /// Categories used within the current history, oldest first, deduplicated.
    pub fn used_categories(&self) -> Vec<QuestionCategory> {
        let mut used = Vec::new();
        for category in self.history.iter().filter_map(|r| r.category) {
            if !used.contains(&category) {
                used.push(category);
            }
        }
        used
    }

    /// Start word occurrence counts within the history.
    pub fn start_word_counts(&self) -> &HashMap<String, usize> {
        &self.start_word_counts
    }

    /// Current history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.history.iter()
    }

    /// Number of questions currently held.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True if nothing has been recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Total questions recorded over the engine's lifetime.
    pub fn total_recorded(&self) -> usize {
        self.total_recorded
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.history.clear();
        self.start_word_counts.clear();
        self.total_recorded = 0;
    }
}
