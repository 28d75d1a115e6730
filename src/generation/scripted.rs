use async_trait::async_trait;
use tracing::debug;

use super::{truncate_words, BreakthroughInsight, QuestionGenerator};
use crate::error::GenerationResult;
use crate::patterns::QuestionCategory;
use crate::stage::{BreakthroughReady, StageQuestion};

/// Words never picked as the "specific" subject of a question.
const FILLER: &[&str] = &[
    "about", "actually", "after", "again", "also", "always", "because", "been", "being", "could",
    "does", "doing", "don't", "from", "have", "honestly", "just", "kind", "know", "like", "maybe",
    "more", "much", "probably", "really", "should", "some", "sort", "than", "that", "their",
    "them", "then", "there", "they", "thing", "things", "think", "this", "very", "want", "what",
    "when", "where", "which", "wish", "with", "would", "your",
];

const QUOTE_WORDS: usize = 6;

/// Offline generator that fills pattern-library templates from the
/// user's own words. Deterministic for a given transcript.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator;

impl ScriptedGenerator {
    /// Create a scripted generator
    pub fn new() -> Self {
        Self
    }
}

fn content_words(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
    {
        if word.chars().count() >= 4 && !FILLER.contains(&word.as_str()) && !seen.contains(&word) {
            seen.push(word);
        }
    }
    seen
}

fn quote(text: &str) -> String {
    text.split_whitespace()
        .take(QUOTE_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}

fn fill_template(template: &str, latest: &str) -> String {
    let words = content_words(latest);
    let specific = words.first().map(String::as_str).unwrap_or("this");
    let other = words.get(1).map(String::as_str).unwrap_or("the alternative");
    let quoted = quote(latest);

    template
        .replace("{specific}", specific)
        .replace("{other}", other)
        .replace("{quote}", if quoted.is_empty() { "that" } else { &quoted })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    async fn generate_question(
        &self,
        question: &StageQuestion,
        category: QuestionCategory,
        history: &[String],
    ) -> GenerationResult<String> {
        let templates = category.templates();
        let latest = history.last().map(String::as_str).unwrap_or("");
        let template = templates[history.len() % templates.len()];

        let text = capitalize(&fill_template(template, latest));
        debug!(stage = %question.stage, category = %category, "Scripted question");
        Ok(truncate_words(&text, question.max_words))
    }

    async fn synthesize_breakthrough(
        &self,
        ready: &BreakthroughReady,
        history: &[String],
    ) -> GenerationResult<BreakthroughInsight> {
        let mut card = BreakthroughInsight::fallback_card(&ready.patterns);
        if ready.patterns.is_empty() {
            if let Some(first) = history.first().map(|t| quote(t)).filter(|q| !q.is_empty()) {
                card.friction = format!("\"{}\" keeps running into what you actually want.", first);
            }
        }
        card.validate()?;
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{get_stage_question, Pattern, Stage, StopReason};

    fn history(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_content_words_skip_filler() {
        assert_eq!(
            content_words("I really want to leave my job but money is tight"),
            vec!["leave", "money", "tight"]
        );
    }

    #[test]
    fn test_fill_template_placeholders() {
        let latest = "My manager keeps moving the deadline";
        assert_eq!(
            fill_template("How is {specific} different from {other}?", latest),
            "How is manager different from keeps?"
        );
        assert_eq!(
            fill_template("You said \"{quote}\". What sits under that?", latest),
            "You said \"My manager keeps moving the deadline\". What sits under that?"
        );
    }

    #[test]
    fn test_fill_template_empty_latest() {
        assert_eq!(
            fill_template("What's underneath {specific}?", ""),
            "What's underneath this?"
        );
    }

    #[tokio::test]
    async fn test_question_respects_word_limit() {
        let generator = ScriptedGenerator::new();
        let mut question = get_stage_question(Stage::Friction);
        question.max_words = 4;
        let text = generator
            .generate_question(
                &question,
                QuestionCategory::Hypothetical,
                &history(&["my career feels frozen"]),
            )
            .await
            .unwrap();
        assert!(text.split_whitespace().count() <= 4);
        assert!(text.ends_with('?'));
    }

    #[tokio::test]
    async fn test_question_varies_with_turn_count() {
        let generator = ScriptedGenerator::new();
        let question = get_stage_question(Stage::Desire);
        let a = generator
            .generate_question(&question, QuestionCategory::Direct, &history(&["deadline stress"]))
            .await
            .unwrap();
        let b = generator
            .generate_question(
                &question,
                QuestionCategory::Direct,
                &history(&["x", "deadline stress"]),
            )
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_synthesis_uses_patterns() {
        let ready = BreakthroughReady {
            reason: StopReason::PatternDetected,
            patterns: vec![Pattern {
                name: "control-vs-chaos".to_string(),
                evidence: vec!["control".to_string(), "chaos".to_string()],
                confidence: 0.85,
            }],
            prompt: String::new(),
            questions_asked: 1,
        };
        let card = ScriptedGenerator::new()
            .synthesize_breakthrough(&ready, &history(&["I need control"]))
            .await
            .unwrap();
        assert!(card.insight.contains("control"));
    }

    #[tokio::test]
    async fn test_synthesis_quotes_user_without_patterns() {
        let ready = BreakthroughReady {
            reason: StopReason::UserRequestedSkip,
            patterns: vec![],
            prompt: String::new(),
            questions_asked: 0,
        };
        let card = ScriptedGenerator::new()
            .synthesize_breakthrough(&ready, &history(&["I hate my commute, honestly."]))
            .await
            .unwrap();
        assert_eq!(
            card.friction,
            "\"I hate my commute, honestly\" keeps running into what you actually want."
        );
    }
}
