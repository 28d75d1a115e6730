//! Fast-track stage engine: ask up to three questions, then synthesize.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::{detect_patterns_early, Pattern};
use crate::config::StageConfig;
use crate::frustration::{should_short_circuit, wants_to_skip};
use crate::prompts::{
    BLOCKER_QUESTION_PROMPT, BREAKTHROUGH_QUESTION_PROMPT, BREAKTHROUGH_SYNTHESIS_PROMPT,
    DESIRE_QUESTION_PROMPT, FRICTION_QUESTION_PROMPT,
};

static UNCERTAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(i\s+don'?t\s+know|idk|not\s+sure|no\s+idea|no\s+clue|dunno|i'?m\s+unsure|i\s+can'?t\s+say)\b")
        .expect("uncertainty pattern is valid")
});

/// Words shorter than this are ignored by the repetition check.
const SIMILARITY_MIN_WORD_LEN: usize = 4;

/// Question-asking phase of the fast-track flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Friction,
    Desire,
    Blocker,
    Breakthrough,
}

impl Stage {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Friction => "friction",
            Stage::Desire => "desire",
            Stage::Blocker => "blocker",
            Stage::Breakthrough => "breakthrough",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "friction" => Ok(Stage::Friction),
            "desire" => Ok(Stage::Desire),
            "blocker" => Ok(Stage::Blocker),
            "breakthrough" => Ok(Stage::Breakthrough),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Why the engine stopped asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxQuestionsReached,
    UserStuck,
    PatternDetected,
    UserRequestedSkip,
    UserRepeating,
}

impl StopReason {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::MaxQuestionsReached => "max_questions_reached",
            StopReason::UserStuck => "user_stuck",
            StopReason::PatternDetected => "pattern_detected",
            StopReason::UserRequestedSkip => "user_requested_skip",
            StopReason::UserRepeating => "user_repeating",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the stop policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopDecision {
    pub stop: bool,
    pub reason: Option<StopReason>,
}

impl StopDecision {
    fn stop(reason: StopReason) -> Self {
        Self {
            stop: true,
            reason: Some(reason),
        }
    }

    fn keep_asking() -> Self {
        Self {
            stop: false,
            reason: None,
        }
    }
}

/// Instruction and word budget handed to the question generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageQuestion {
    pub stage: Stage,
    pub system_prompt: &'static str,
    pub max_words: usize,
}

/// Per-session conversational state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub stage: Stage,
    pub questions_asked: u32,
    /// Top patterns, confidence descending
    pub detected_patterns: Vec<Pattern>,
    pub stop_reason: Option<StopReason>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            stage: Stage::Friction,
            questions_asked: 0,
            detected_patterns: Vec::new(),
            stop_reason: None,
        }
    }
}

impl ConversationState {
    /// Derived: the stage chain has reached breakthrough.
    pub fn ready_for_breakthrough(&self) -> bool {
        self.stage == Stage::Breakthrough
    }
}

/// Value handed to the caller once asking stops. The caller forwards it to
/// the director; the engine never drives visuals itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakthroughReady {
    pub reason: StopReason,
    pub patterns: Vec<Pattern>,
    pub prompt: String,
    pub questions_asked: u32,
}

/// Result of evaluating one user turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TurnDecision {
    Ask { question: StageQuestion },
    Breakthrough(BreakthroughReady),
}

/// friction -> desire -> blocker -> breakthrough; breakthrough is absorbing.
pub fn advance_stage(current: Stage) -> Stage {
    match current {
        Stage::Friction => Stage::Desire,
        Stage::Desire => Stage::Blocker,
        Stage::Blocker | Stage::Breakthrough => Stage::Breakthrough,
    }
}

/// Prompt template and the default 15-word ceiling for a stage.
pub fn get_stage_question(stage: Stage) -> StageQuestion {
    stage_question(stage, StageConfig::default().question_max_words)
}

fn stage_question(stage: Stage, max_words: usize) -> StageQuestion {
    let system_prompt = match stage {
        Stage::Friction => FRICTION_QUESTION_PROMPT,
        Stage::Desire => DESIRE_QUESTION_PROMPT,
        Stage::Blocker => BLOCKER_QUESTION_PROMPT,
        Stage::Breakthrough => BREAKTHROUGH_QUESTION_PROMPT,
    };
    StageQuestion {
        stage,
        system_prompt,
        max_words,
    }
}

/// Synthesis instruction including the detected patterns.
pub fn get_breakthrough_prompt(patterns: &[Pattern]) -> String {
    let mut prompt = String::from(BREAKTHROUGH_SYNTHESIS_PROMPT);
    prompt.push_str("\n\nDetected patterns:\n");

    if patterns.is_empty() {
        prompt.push_str("- none detected; infer the tension from the conversation itself\n");
        return prompt;
    }

    for pattern in patterns {
        prompt.push_str(&format!(
            "- {} (confidence {:.2}; evidence: {})\n",
            pattern.name,
            pattern.confidence,
            pattern.evidence.join(", ")
        ));
    }
    prompt
}

fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| w.chars().count() >= SIMILARITY_MIN_WORD_LEN)
        .map(str::to_string)
        .collect()
}

/// Shared content words over the larger set's size.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let a = content_words(a);
    let b = content_words(b);
    let largest = a.len().max(b.len());
    if largest == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / largest as f64
}

/// Count turns that read as "I don't know".
pub fn count_uncertain_turns(history: &[String]) -> usize {
    history.iter().filter(|turn| UNCERTAIN.is_match(turn)).count()
}

/// Stop policy with default thresholds.
pub fn should_stop_asking(
    latest: &str,
    history: &[String],
    patterns: &[Pattern],
    questions_asked: u32,
) -> StopDecision {
    evaluate_stop(&StageConfig::default(), latest, history, patterns, questions_asked)
}

/// Stop policy; the first matching rule wins.
pub fn evaluate_stop(
    config: &StageConfig,
    latest: &str,
    history: &[String],
    patterns: &[Pattern],
    questions_asked: u32,
) -> StopDecision {
    if questions_asked >= config.max_questions {
        return StopDecision::stop(StopReason::MaxQuestionsReached);
    }

    if count_uncertain_turns(history) >= config.stuck_threshold {
        return StopDecision::stop(StopReason::UserStuck);
    }

    if patterns
        .iter()
        .any(|p| p.confidence > config.pattern_stop_confidence)
    {
        return StopDecision::stop(StopReason::PatternDetected);
    }

    if wants_to_skip(latest) {
        return StopDecision::stop(StopReason::UserRequestedSkip);
    }

    if let [.., previous, last] = history {
        if word_overlap(previous, last) > config.repeat_similarity {
            return StopDecision::stop(StopReason::UserRepeating);
        }
    }

    StopDecision::keep_asking()
}

/// Per-session handle over [`ConversationState`].
#[derive(Debug, Clone, Default)]
pub struct StageEngine {
    config: StageConfig,
    state: ConversationState,
}

impl StageEngine {
    /// Create an engine at the friction stage.
    pub fn new(config: StageConfig) -> Self {
        Self {
            config,
            state: ConversationState::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Engine thresholds.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Evaluate a user turn. `history` holds the earlier user turns only.
    pub fn evaluate_turn(&mut self, latest: &str, history: &[String]) -> TurnDecision {
        let patterns = detect_patterns_early(latest, history);
        self.state.detected_patterns = patterns.clone();

        // The question cap outranks a frustrated or skipping reply
        let under_cap = self.state.questions_asked < self.config.max_questions;
        let decision = if under_cap && should_short_circuit(latest) {
            StopDecision::stop(StopReason::UserRequestedSkip)
        } else {
            evaluate_stop(
                &self.config,
                latest,
                history,
                &patterns,
                self.state.questions_asked,
            )
        };

        let reason = match decision.reason {
            Some(reason) => Some(reason),
            // Stage chain exhausted under a larger question cap
            None if self.state.stage == Stage::Breakthrough => {
                Some(StopReason::MaxQuestionsReached)
            }
            None => None,
        };

        match reason {
            Some(reason) => {
                info!(
                    reason = %reason,
                    questions_asked = self.state.questions_asked,
                    patterns = patterns.len(),
                    "Stopping questions, ready for breakthrough"
                );
                self.state.stage = Stage::Breakthrough;
                self.state.stop_reason = Some(reason);
                TurnDecision::Breakthrough(BreakthroughReady {
                    reason,
                    prompt: get_breakthrough_prompt(&patterns),
                    patterns,
                    questions_asked: self.state.questions_asked,
                })
            }
            None => {
                debug!(
                    stage = %self.state.stage,
                    questions_asked = self.state.questions_asked,
                    "Asking next question"
                );
                TurnDecision::Ask {
                    question: stage_question(self.state.stage, self.config.question_max_words),
                }
            }
        }
    }

    /// Call only after a question was produced and shown to the user.
    pub fn mark_question_asked(&mut self) {
        self.state.questions_asked = (self.state.questions_asked + 1).min(self.config.max_questions);
        let next = advance_stage(self.state.stage);
        if next != self.state.stage {
            info!(from = %self.state.stage, to = %next, "Stage advanced");
        }
        self.state.stage = next;
    }

    /// Stop asking for a reason decided outside turn evaluation, e.g. the
    /// question could not be generated.
    pub fn force_breakthrough(&mut self, reason: StopReason) -> BreakthroughReady {
        info!(
            reason = %reason,
            questions_asked = self.state.questions_asked,
            "Forcing breakthrough"
        );
        self.state.stage = Stage::Breakthrough;
        self.state.stop_reason = Some(reason);
        BreakthroughReady {
            reason,
            prompt: get_breakthrough_prompt(&self.state.detected_patterns),
            patterns: self.state.detected_patterns.clone(),
            questions_asked: self.state.questions_asked,
        }
    }

    /// Discard the session's state.
    pub fn reset(&mut self) {
        self.state = ConversationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn pattern(confidence: f64) -> Pattern {
        Pattern {
            name: "control-vs-chaos".to_string(),
            evidence: vec!["control".to_string()],
            confidence,
        }
    }

    #[test]
    fn test_advance_stage_reaches_breakthrough_in_three() {
        let s = advance_stage(advance_stage(advance_stage(Stage::Friction)));
        assert_eq!(s, Stage::Breakthrough);
        assert_eq!(advance_stage(Stage::Breakthrough), Stage::Breakthrough);
    }

    #[test]
    fn test_max_questions_wins_over_everything() {
        let decision = should_stop_asking(
            "just tell me the answer",
            &strings(&["I don't know", "I don't know"]),
            &[pattern(0.95)],
            3,
        );
        assert_eq!(decision.reason, Some(StopReason::MaxQuestionsReached));
        assert!(decision.stop);
    }

    #[test]
    fn test_user_stuck() {
        let decision = should_stop_asking(
            "hmm",
            &strings(&["I don't know", "I don't know what to do"]),
            &[],
            1,
        );
        assert_eq!(
            decision,
            StopDecision {
                stop: true,
                reason: Some(StopReason::UserStuck)
            }
        );
    }

    #[test]
    fn test_single_uncertain_turn_is_not_stuck() {
        let decision = should_stop_asking("maybe work", &strings(&["not sure"]), &[], 1);
        assert!(!decision.stop);
    }

    #[test]
    fn test_pattern_confidence_must_exceed_threshold() {
        assert!(!should_stop_asking("x", &[], &[pattern(0.8)], 0).stop);
        assert_eq!(
            should_stop_asking("x", &[], &[pattern(0.85)], 0).reason,
            Some(StopReason::PatternDetected)
        );
    }

    #[test]
    fn test_skip_request_at_zero_questions() {
        let decision = should_stop_asking("just tell me the answer", &[], &[], 0);
        assert_eq!(decision.reason, Some(StopReason::UserRequestedSkip));
    }

    #[test]
    fn test_user_repeating() {
        let history = strings(&[
            "my manager keeps ignoring my ideas in meetings",
            "my manager keeps ignoring my ideas during meetings",
        ]);
        assert!(word_overlap(&history[0], &history[1]) > 0.6);
        assert_eq!(
            should_stop_asking("yeah", &history, &[], 2).reason,
            Some(StopReason::UserRepeating)
        );
    }

    #[test]
    fn test_empty_history_keeps_asking() {
        assert_eq!(
            should_stop_asking("my job feels heavy", &[], &[], 0),
            StopDecision {
                stop: false,
                reason: None
            }
        );
    }

    #[test]
    fn test_word_overlap_ignores_short_words() {
        assert_eq!(word_overlap("I am so sad", "I am so mad"), 0.0);
        assert_eq!(word_overlap("", ""), 0.0);
        assert_eq!(word_overlap("family pressure", "family pressure"), 1.0);
    }

    #[test]
    fn test_stage_question_budget() {
        let q = get_stage_question(Stage::Desire);
        assert_eq!(q.max_words, 15);
        assert_eq!(q.system_prompt, DESIRE_QUESTION_PROMPT);
        assert_eq!(get_stage_question(Stage::Friction).system_prompt, FRICTION_QUESTION_PROMPT);
    }

    #[test]
    fn test_breakthrough_prompt_lists_patterns() {
        let prompt = get_breakthrough_prompt(&[pattern(0.7)]);
        assert!(prompt.contains("control-vs-chaos"));
        assert!(prompt.contains("0.70"));
        assert!(prompt.contains("\"grease\""));

        let empty = get_breakthrough_prompt(&[]);
        assert!(empty.contains("none detected"));
    }

    #[test]
    fn test_engine_full_fast_track() {
        let mut engine = StageEngine::default();
        let mut history = Vec::new();

        for (i, answer) in ["work is heavy", "I want quiet mornings", "my boss"]
            .iter()
            .enumerate()
        {
            match engine.evaluate_turn(answer, &history) {
                TurnDecision::Ask { question } => {
                    assert_eq!(question.stage, engine.state().stage);
                }
                other => panic!("turn {} should ask, got {:?}", i, other),
            }
            engine.mark_question_asked();
            history.push(answer.to_string());
        }

        assert_eq!(engine.state().questions_asked, 3);
        assert!(engine.state().ready_for_breakthrough());

        match engine.evaluate_turn("that's all", &history) {
            TurnDecision::Breakthrough(ready) => {
                assert_eq!(ready.reason, StopReason::MaxQuestionsReached);
                assert_eq!(ready.questions_asked, 3);
            }
            other => panic!("expected breakthrough, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_frustration_short_circuits() {
        let mut engine = StageEngine::default();
        let decision = engine.evaluate_turn("ugh this is pointless, too many questions", &[]);
        match decision {
            TurnDecision::Breakthrough(ready) => {
                assert_eq!(ready.reason, StopReason::UserRequestedSkip);
                assert_eq!(ready.questions_asked, 0);
            }
            other => panic!("expected breakthrough, got {:?}", other),
        }
        assert_eq!(engine.state().stop_reason, Some(StopReason::UserRequestedSkip));
    }

    #[test]
    fn test_engine_cap_outranks_skip() {
        let mut engine = StageEngine::default();
        for _ in 0..3 {
            engine.mark_question_asked();
        }
        let decision = engine.evaluate_turn("just skip it, this is pointless", &[]);
        match decision {
            TurnDecision::Breakthrough(ready) => {
                assert_eq!(ready.reason, StopReason::MaxQuestionsReached);
                assert_eq!(ready.questions_asked, 3);
            }
            other => panic!("expected breakthrough, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_stores_detected_patterns() {
        let mut engine = StageEngine::default();
        engine.evaluate_turn("I can't control anything, it's all chaos", &[]);
        assert_eq!(engine.state().detected_patterns[0].name, "control-vs-chaos");
    }

    #[test]
    fn test_engine_reset() {
        let mut engine = StageEngine::default();
        engine.mark_question_asked();
        engine.reset();
        assert_eq!(engine.state(), &ConversationState::default());
    }

    #[test]
    fn test_questions_asked_saturates() {
        let mut engine = StageEngine::default();
        for _ in 0..10 {
            engine.mark_question_asked();
        }
        assert_eq!(engine.state().questions_asked, 3);
        assert_eq!(engine.state().stage, Stage::Breakthrough);
    }

    #[test]
    fn test_force_breakthrough_keeps_count_and_patterns() {
        let mut engine = StageEngine::default();
        engine.evaluate_turn("I need control over this chaos", &[]);
        let ready = engine.force_breakthrough(StopReason::MaxQuestionsReached);
        assert_eq!(ready.questions_asked, 0);
        assert_eq!(ready.patterns, engine.state().detected_patterns);
        assert!(engine.state().ready_for_breakthrough());
        assert_eq!(
            engine.state().stop_reason,
            Some(StopReason::MaxQuestionsReached)
        );
    }

    proptest! {
        #[test]
        fn prop_cap_always_stops(text in ".{0,80}", turns in proptest::collection::vec(".{0,40}", 0..5)) {
            let decision = should_stop_asking(&text, &turns, &[], 3);
            prop_assert!(decision.stop);
            prop_assert_eq!(decision.reason, Some(StopReason::MaxQuestionsReached));
        }

        #[test]
        fn prop_advance_is_monotonic(steps in 0usize..10) {
            let mut stage = Stage::Friction;
            for _ in 0..steps {
                stage = advance_stage(stage);
            }
            if steps >= 3 {
                prop_assert_eq!(stage, Stage::Breakthrough);
            } else {
                prop_assert_ne!(stage, Stage::Breakthrough);
            }
        }
    }
}
