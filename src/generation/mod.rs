//! Question and breakthrough generation.
//!
//! [`QuestionGenerator`] is the boundary to whatever writes the words. Two
//! implementations ship: [`LangbaseGenerator`] runs Langbase pipes and
//! [`ScriptedGenerator`] fills pattern-library templates offline.

mod langbase;
mod scripted;

pub use langbase::LangbaseGenerator;
pub use scripted::ScriptedGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, GenerationResult};
use crate::patterns::QuestionCategory;
use crate::stage::{BreakthroughReady, Pattern, StageQuestion};

/// Word ceiling for each breakthrough card field.
pub const INSIGHT_MAX_WORDS: usize = 25;

/// Writes questions and breakthrough cards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// One question for the stage, in the given category's style.
    /// `history` holds the user's turns, oldest first.
    async fn generate_question(
        &self,
        question: &StageQuestion,
        category: QuestionCategory,
        history: &[String],
    ) -> GenerationResult<String>;

    /// The friction / grease / insight card.
    async fn synthesize_breakthrough(
        &self,
        ready: &BreakthroughReady,
        history: &[String],
    ) -> GenerationResult<BreakthroughInsight>;
}

/// The card shown at breakthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakthroughInsight {
    pub friction: String,
    pub grease: String,
    pub insight: String,
}

impl BreakthroughInsight {
    /// Parse and validate a model completion (raw JSON or a fenced block).
    pub fn parse(completion: &str) -> GenerationResult<Self> {
        let json = extract_json_from_completion(completion)
            .map_err(|message| GenerationError::InvalidResponse { message })?;
        let insight: Self =
            serde_json::from_str(json).map_err(|e| GenerationError::InvalidResponse {
                message: format!("Breakthrough JSON did not match expected shape: {}", e),
            })?;
        insight.validate()?;
        Ok(insight)
    }

    /// Each field must be non-empty and at most [`INSIGHT_MAX_WORDS`] words.
    pub fn validate(&self) -> GenerationResult<()> {
        for (field, value) in [
            ("friction", &self.friction),
            ("grease", &self.grease),
            ("insight", &self.insight),
        ] {
            let words = value.split_whitespace().count();
            if words == 0 {
                return Err(GenerationError::Validation {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            if words > INSIGHT_MAX_WORDS {
                return Err(GenerationError::Validation {
                    field: field.to_string(),
                    reason: format!("{} words exceeds limit of {}", words, INSIGHT_MAX_WORDS),
                });
            }
        }
        Ok(())
    }

    /// Static card used when synthesis fails. Uses the strongest catalog
    /// pattern's canned insight when one was detected.
    pub fn fallback_card(patterns: &[Pattern]) -> Self {
        let top = patterns.iter().find_map(|p| p.insight().map(|i| (p, i)));
        match top {
            Some((pattern, insight)) => {
                let (a, b) = pattern.sides();
                Self {
                    friction: format!("{} and {} keep pulling against each other.", a, b),
                    grease: format!("Give {} one small, safe step this week and watch what happens.", b),
                    insight: insight.to_string(),
                }
            }
            None => Self {
                friction: "What you keep doing and what you keep wanting are grinding.".to_string(),
                grease: "Pick one tiny move toward the want, small enough to feel silly.".to_string(),
                insight: "You already know the next step; you have been waiting for permission."
                    .to_string(),
            },
        }
    }
}

/// Extract JSON from a completion that may be wrapped in markdown fences.
fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    // Prose around a bare object
    if let (Some(start), Some(end)) = (completion.find('{'), completion.rfind('}')) {
        if start < end {
            return Ok(&completion[start..=end]);
        }
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

/// Trim to a single line of at most `max_words` words.
pub(crate) fn truncate_words(text: &str, max_words: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .trim_matches('"');
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut cut = words[..max_words].join(" ");
    let trimmed_len = cut.trim_end_matches([',', ';', ':', '-', '.', '!']).len();
    cut.truncate(trimmed_len);
    if !cut.ends_with('?') {
        cut.push('?');
    }
    cut
}
