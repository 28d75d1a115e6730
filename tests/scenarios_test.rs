//! End-to-end behavior checks through the public API.
//!
//! Covers the stop policy, skip detection, pattern detection, question
//! de-duplication and director lifecycle guarantees.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tokio::sync::broadcast::Receiver;

use aspiral_reflection::anti_repetition::AntiRepetitionEngine;
use aspiral_reflection::config::{AntiRepetitionConfig, DirectorConfig};
use aspiral_reflection::director::{
    Director, DirectorEvent, Phase, PrewarmRequest, QualityTier,
};
use aspiral_reflection::error::DirectorError;
use aspiral_reflection::frustration::wants_to_skip;
use aspiral_reflection::stage::{
    advance_stage, detect_patterns_early, should_stop_asking, Stage, StopDecision, StopReason,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn drain(rx: &mut Receiver<DirectorEvent>) -> Vec<DirectorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_stuck_user_stops_questions() {
    let history = strings(&["I don't know", "I don't know what to do"]);
    let decision = should_stop_asking("I don't know what to do", &history, &[], 1);
    assert_eq!(
        decision,
        StopDecision {
            stop: true,
            reason: Some(StopReason::UserStuck)
        }
    );
}

#[test]
fn test_skip_request_stops_before_first_question() {
    let text = "just tell me the answer";
    assert!(wants_to_skip(text));
    let decision = should_stop_asking(text, &[], &[], 0);
    assert_eq!(decision.reason, Some(StopReason::UserRequestedSkip));
}

#[test]
fn test_control_vs_chaos_detected() {
    let patterns = detect_patterns_early("I can't control anything, it's all chaos", &[]);
    let found = patterns
        .iter()
        .find(|p| p.name == "control-vs-chaos")
        .expect("control-vs-chaos detected");
    assert_eq!(found.confidence, 0.7);
}

#[test]
fn test_shared_opening_is_too_similar() {
    let mut engine = AntiRepetitionEngine::new(AntiRepetitionConfig::default());
    assert!(!engine.is_too_similar("What's grinding here?"));
    engine.record("What's grinding here?", None);
    assert!(engine.is_too_similar("What's grinding now?"));
}

#[test]
fn test_stage_chain_reaches_breakthrough_in_three_steps() {
    let stage = advance_stage(advance_stage(advance_stage(Stage::Friction)));
    assert_eq!(stage, Stage::Breakthrough);
    assert_eq!(advance_stage(Stage::Breakthrough), Stage::Breakthrough);
}

#[test]
fn test_play_without_prewarm_is_precondition_failure() {
    let mut director = Director::new(&DirectorConfig::default());
    let mut rx = director.subscribe();

    let result = director.play(None, QualityTier::Mid);

    assert_eq!(result, Err(DirectorError::NotPrewarmed));
    assert_eq!(director.state().phase, Phase::Idle);
    assert_eq!(director.state().variant, None);
    assert_eq!(
        drain(&mut rx),
        vec![DirectorEvent::Rejected {
            operation: "play",
            phase: Phase::Idle
        }]
    );
}

#[test]
fn test_director_phase_order_without_repeats() {
    let mut director = Director::new(&DirectorConfig::default());
    let mut rx = director.subscribe();

    director.prewarm(PrewarmRequest::default()).unwrap();
    director.play(None, QualityTier::Mid).unwrap();
    director.complete().unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            DirectorEvent::PhaseChanged {
                phase: Phase::Prewarm
            },
            DirectorEvent::PhaseChanged { phase: Phase::Play },
            DirectorEvent::PhaseChanged {
                phase: Phase::Settle
            },
            DirectorEvent::PhaseChanged {
                phase: Phase::Complete
            },
            DirectorEvent::Completed,
        ]
    );
}

#[test]
fn test_director_abort_from_play_never_completes() {
    let mut director = Director::new(&DirectorConfig::default());
    director.prewarm(PrewarmRequest::default()).unwrap();
    director.play(None, QualityTier::High).unwrap();

    let mut rx = director.subscribe();
    assert!(director.abort("user_cancel"));
    assert!(matches!(
        director.complete(),
        Err(DirectorError::InvalidTransition { .. })
    ));

    let events = drain(&mut rx);
    assert_eq!(
        events[0],
        DirectorEvent::Aborted {
            reason: "user_cancel".to_string(),
            from: Phase::Play
        }
    );
    assert!(!events.contains(&DirectorEvent::Completed));
    assert!(!events.contains(&DirectorEvent::PhaseChanged {
        phase: Phase::Complete
    }));
}

proptest! {
    #[test]
    fn prop_start_word_counts_track_history(
        questions in proptest::collection::vec("[a-zA-Z]{1,8}( [a-z]{1,6}){0,5}\\?", 0..40)
    ) {
        let mut engine = AntiRepetitionEngine::new(AntiRepetitionConfig::default());
        for q in &questions {
            engine.record(q, None);
        }
        let total: usize = engine.start_word_counts().values().sum();
        prop_assert_eq!(total, questions.len().min(10));
    }

    #[test]
    fn prop_confidence_never_exceeds_cap(
        turns in proptest::collection::vec(
            prop::sample::select(vec![
                "control", "chaos", "safe", "freedom", "belong", "perfect", "rest", "should",
                "alone", "plan", "ordinary words",
            ]),
            0..30,
        )
    ) {
        let history: Vec<String> = turns.iter().map(|s| s.to_string()).collect();
        for pattern in detect_patterns_early("", &history) {
            prop_assert!(pattern.confidence <= 0.95);
        }
    }
}
