//! Circuit breaker guarding the OmniLink webhook.
//!
//! A closed breaker lets deliveries through. After `failure_threshold`
//! failed deliveries in a row it trips open and holds the queue until
//! `recovery_timeout_secs` have passed since it opened. The next flush then
//! probes in half-open; `success_threshold` deliveries close it again, one
//! failure trips it again.
//!
//! Time is passed in explicitly so callers and tests control the clock.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;

/// Delivery gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    failure_streak: u32,
    probe_successes: u32,
    opened_at: Option<DateTime<Utc>>,
    trips: u32,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_streak: 0,
            probe_successes: 0,
            opened_at: None,
            trips: 0,
        }
    }

    fn recovery_timeout(&self) -> Duration {
        Duration::seconds(self.config.recovery_timeout_secs as i64)
    }

    /// Whether a delivery may go out at `now`. Moves an open breaker whose
    /// timeout has elapsed to half-open.
    pub fn allow(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != CircuitState::Open {
            return true;
        }
        match self.retry_in(now) {
            Some(wait) if wait > Duration::zero() => false,
            _ => {
                self.probe_successes = 0;
                self.move_to(CircuitState::HalfOpen);
                true
            }
        }
    }

    pub fn on_delivered(&mut self) {
        self.failure_streak = 0;
        if self.state == CircuitState::HalfOpen {
            self.probe_successes += 1;
            if self.probe_successes >= self.config.success_threshold {
                self.opened_at = None;
                self.move_to(CircuitState::Closed);
            }
        }
    }

    pub fn on_failed(&mut self, now: DateTime<Utc>) {
        self.failure_streak += 1;
        let trip = match self.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => self.failure_streak >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            self.opened_at = Some(now);
            self.trips += 1;
            warn!(
                failure_streak = self.failure_streak,
                trips = self.trips,
                "OmniLink circuit tripped"
            );
            self.move_to(CircuitState::Open);
        }
    }

    fn move_to(&mut self, next: CircuitState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "OmniLink circuit state changed");
            self.state = next;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Failed deliveries since the last success.
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// How many times the breaker has opened.
    pub fn trips(&self) -> u32 {
        self.trips
    }

    /// Remaining wait before a probe at `now`; `None` unless open.
    pub fn retry_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.state != CircuitState::Open {
            return None;
        }
        let opened_at = self.opened_at?;
        let remaining = opened_at + self.recovery_timeout() - now;
        Some(remaining.max(Duration::zero()))
    }

    /// Close the breaker and forget the streak. The trip count is kept.
    pub fn reset(&mut self) {
        self.failure_streak = 0;
        self.probe_successes = 0;
        self.opened_at = None;
        self.move_to(CircuitState::Closed);
    }
}
