//! Optional outbound OmniLink integration.
//!
//! Session milestones are queued as [`OmniLinkEvent`]s and posted to a
//! webhook on [`OmniLinkClient::flush`]. Delivery is best effort: a bounded
//! queue absorbs bursts and a circuit breaker stops hammering a dead endpoint.

mod circuit_breaker;
mod client;
mod queue;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{FlushReport, OmniLinkClient};
pub use queue::EventQueue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milestone reported to OmniLink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    QuestionAsked,
    BreakthroughReady,
    BreakthroughCompleted,
    BreakthroughAborted,
}

impl EventKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionStarted => "session_started",
            EventKind::QuestionAsked => "question_asked",
            EventKind::BreakthroughReady => "breakthrough_ready",
            EventKind::BreakthroughCompleted => "breakthrough_completed",
            EventKind::BreakthroughAborted => "breakthrough_aborted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmniLinkEvent {
    pub id: String,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OmniLinkEvent {
    /// New event with a fresh id and the current time.
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            created_at: Utc::now(),
        }
    }
}
