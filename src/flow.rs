//! Per-turn reflection flow.
//!
//! Wires the stage engine, anti-repetition, energy matching, the session
//! store and a [`QuestionGenerator`]. Each user turn yields either the next
//! question or a breakthrough card plus the [`BreakthroughReady`] value the
//! host forwards to [`crate::director::Director::prewarm`].

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::anti_repetition::AntiRepetitionEngine;
use crate::config::Config;
use crate::error::{AppError, AppResult, GenerationError};
use crate::generation::{BreakthroughInsight, QuestionGenerator};
use crate::omnilink::{EventKind, FlushReport, OmniLinkClient, OmniLinkEvent};
use crate::patterns::{adjust_question_energy, get_available_patterns, match_energy, QuestionCategory};
use crate::session::{Breakthrough, Connection, Entity, EntityType, Message, SessionStore};
use crate::stage::{
    BreakthroughReady, Pattern, Stage, StageEngine, StageQuestion, StopReason, TurnDecision,
};

/// What the host should show after a user turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Blank input; nothing changed
    Ignored,
    Question {
        text: String,
        stage: Stage,
        category: QuestionCategory,
    },
    Breakthrough {
        insight: BreakthroughInsight,
        ready: BreakthroughReady,
        /// The static card was used because synthesis failed
        fallback: bool,
    },
    /// The breakthrough was already delivered; nothing changes until
    /// [`ReflectionFlow::start_over`]
    Complete,
}

/// One reflection conversation.
pub struct ReflectionFlow<S, G> {
    engine: StageEngine,
    anti_repetition: AntiRepetitionEngine,
    store: S,
    generator: G,
    omnilink: Option<OmniLinkClient>,
    /// Set once a breakthrough card has been written to the store
    finished: bool,
}

impl<S: SessionStore, G: QuestionGenerator> ReflectionFlow<S, G> {
    /// Create a flow; opens a session if the store has none.
    pub fn new(config: &Config, mut store: S, generator: G) -> Self {
        if store.current_session().is_none() {
            store.start_session();
        }
        Self {
            engine: StageEngine::new(config.stage.clone()),
            anti_repetition: AntiRepetitionEngine::new(config.anti_repetition.clone()),
            store,
            generator,
            omnilink: None,
            finished: false,
        }
    }

    /// Report milestones to OmniLink.
    pub fn with_omnilink(mut self, client: OmniLinkClient) -> Self {
        self.omnilink = Some(client);
        self
    }

    pub fn engine(&self) -> &StageEngine {
        &self.engine
    }

    pub fn anti_repetition(&self) -> &AntiRepetitionEngine {
        &self.anti_repetition
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one user turn.
    pub async fn handle_turn(&mut self, text: &str) -> AppResult<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        if self.finished {
            debug!("Turn after breakthrough ignored");
            return Ok(TurnOutcome::Complete);
        }

        let history = self
            .store
            .current_session()
            .map(|s| s.user_history())
            .unwrap_or_default();
        self.store.add_message(Message::user(text))?;

        let decision = self.engine.evaluate_turn(text, &history);

        let mut transcript = history;
        transcript.push(text.to_string());

        let ready = match decision {
            TurnDecision::Ask { question } => {
                match self.ask(&question, text, &transcript).await {
                    Ok(outcome) => return Ok(outcome),
                    Err(AppError::Generation(e)) => {
                        warn!(
                            error = %e,
                            stage = %question.stage,
                            "Question generation failed, going to breakthrough"
                        );
                        self.engine.force_breakthrough(StopReason::MaxQuestionsReached)
                    }
                    Err(e) => return Err(e),
                }
            }
            TurnDecision::Breakthrough(ready) => ready,
        };

        self.breakthrough(ready, &transcript).await
    }

    async fn ask(
        &mut self,
        question: &StageQuestion,
        latest: &str,
        transcript: &[String],
    ) -> AppResult<TurnOutcome> {
        let categories =
            get_available_patterns(question.stage.into(), &self.anti_repetition.used_categories());
        let energy = match_energy(latest);

        // First category, then one retry with the next if it repeats
        let mut chosen = None;
        for &category in categories.iter().take(2) {
            let raw = self
                .generator
                .generate_question(question, category, transcript)
                .await?;
            let text = adjust_question_energy(&raw, energy);
            let repetitive = self.anti_repetition.is_too_similar(&text);
            chosen = Some((text, category));
            if !repetitive {
                break;
            }
            debug!(category = %category, "Question too similar to recent ones");
        }

        let Some((text, category)) = chosen else {
            return Err(GenerationError::Unavailable {
                message: format!("No question categories for stage {}", question.stage),
            }
            .into());
        };

        self.anti_repetition.record(&text, Some(category));
        self.store.add_message(Message::assistant(text.clone()))?;
        self.engine.mark_question_asked();

        self.notify(
            EventKind::QuestionAsked,
            json!({ "stage": question.stage, "category": category }),
        );
        info!(stage = %question.stage, category = %category, "Question asked");

        Ok(TurnOutcome::Question {
            text,
            stage: question.stage,
            category,
        })
    }

    async fn breakthrough(
        &mut self,
        ready: BreakthroughReady,
        transcript: &[String],
    ) -> AppResult<TurnOutcome> {
        let (insight, fallback) = match self
            .generator
            .synthesize_breakthrough(&ready, transcript)
            .await
        {
            Ok(insight) => (insight, false),
            Err(e) => {
                warn!(error = %e, "Breakthrough synthesis failed, using fallback card");
                (BreakthroughInsight::fallback_card(&ready.patterns), true)
            }
        };

        self.record_pattern_entities(&ready.patterns)?;
        let entity_ids = self
            .store
            .current_session()
            .map(|s| s.entities.iter().map(|e| e.id.clone()).collect())
            .unwrap_or_default();
        let friction_id = self.store.show_friction(&insight.friction, entity_ids)?;
        self.store.apply_grease(&friction_id, &insight.grease)?;
        self.store.trigger_breakthrough(Breakthrough {
            friction: insight.friction.clone(),
            grease: insight.grease.clone(),
            insight: insight.insight.clone(),
            created_at: chrono::Utc::now(),
        })?;

        self.notify(
            EventKind::BreakthroughReady,
            json!({
                "reason": ready.reason,
                "patterns": ready.patterns.iter().map(|p| &p.name).collect::<Vec<_>>(),
                "questions_asked": ready.questions_asked,
                "fallback": fallback,
            }),
        );

        self.finished = true;
        Ok(TurnOutcome::Breakthrough {
            insight,
            ready,
            fallback,
        })
    }

    /// Write each pattern's two sides as value entities joined by a
    /// connection. Sides already in the session are reused.
    fn record_pattern_entities(&mut self, patterns: &[Pattern]) -> AppResult<()> {
        for pattern in patterns {
            let (held, pulling) = pattern.sides();
            let from = self.value_entity(held, pattern.confidence)?;
            let to = self.value_entity(pulling, -pattern.confidence)?;
            self.store.add_connection(Connection {
                from,
                to,
                label: Some(pattern.name.clone()),
            })?;
        }
        Ok(())
    }

    fn value_entity(&mut self, label: &str, valence: f64) -> AppResult<String> {
        let existing = self.store.current_session().and_then(|s| {
            s.entities
                .iter()
                .find(|e| e.entity_type == EntityType::Value && e.label == label)
                .map(|e| e.id.clone())
        });
        match existing {
            Some(id) => Ok(id),
            None => Ok(self
                .store
                .add_entity(Entity::new(EntityType::Value, label, valence))?),
        }
    }

    /// Forget everything and open a new session.
    pub fn start_over(&mut self) {
        self.engine.reset();
        self.anti_repetition.reset();
        self.finished = false;
        let session_id = self.store.start_session();
        self.notify(EventKind::SessionStarted, json!({ "session_id": session_id }));
    }

    /// Queue an OmniLink milestone, if reporting is on.
    pub fn notify(&mut self, kind: EventKind, payload: serde_json::Value) {
        if let Some(client) = self.omnilink.as_mut() {
            client.enqueue(OmniLinkEvent::new(kind, payload));
        }
    }

    /// Deliver queued OmniLink events.
    pub async fn flush_omnilink(&mut self) -> Option<FlushReport> {
        match self.omnilink.as_mut() {
            Some(client) => Some(client.flush().await),
            None => None,
        }
    }
}
