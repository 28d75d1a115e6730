//! Breakthrough director.
//!
//! Owns the lifecycle of the breakthrough cinematic:
//!
//! ```text
//! idle -> prewarm -> play -> settle -> complete -> idle
//!            \         \        \
//!             +---------+--------+--> abort --> idle
//! ```
//!
//! Phase changes, completion, aborts and safe-mode engagement are published on
//! a broadcast channel; see [`Director::subscribe`]. Calls that arrive in the
//! wrong phase are rejected with [`DirectorError::InvalidTransition`] and a
//! [`DirectorEvent::Rejected`] event instead of being silently dropped.

mod fps;
mod variant;

pub use fps::FpsMonitor;
pub use variant::*;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::DirectorConfig;
use crate::error::{DirectorError, DirectorResult};
use crate::session::Entity;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Prewarm,
    Play,
    Settle,
    Complete,
}

impl Phase {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Prewarm => "prewarm",
            Phase::Play => "play",
            Phase::Settle => "settle",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Published lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DirectorEvent {
    PhaseChanged { phase: Phase },
    Completed,
    Aborted { reason: String, from: Phase },
    Rejected { operation: &'static str, phase: Phase },
    SafeModeEngaged { average_fps: f64 },
}

/// Snapshot returned by [`Director::state`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorState {
    pub phase: Phase,
    pub variant: Option<AnimationVariant>,
    pub is_safe_mode: bool,
    pub quality_tier: QualityTier,
}

/// Input to [`Director::prewarm`].
#[derive(Debug, Clone)]
pub struct PrewarmRequest {
    pub entities: Vec<Entity>,
    pub breakthrough_type: Option<String>,
    pub quality_tier: QualityTier,
    pub reduced_motion: bool,
}

impl Default for PrewarmRequest {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            breakthrough_type: None,
            quality_tier: QualityTier::Mid,
            reduced_motion: false,
        }
    }
}

/// Pauses and resumes the host's physics simulation during playback.
#[cfg_attr(test, mockall::automock)]
pub trait PhysicsControl: Send + Sync {
    fn pause_physics(&self);
    fn resume_physics(&self);
}

/// [`PhysicsControl`] for hosts without a simulation.
#[derive(Debug, Clone, Default)]
pub struct NoopPhysics;

impl PhysicsControl for NoopPhysics {
    fn pause_physics(&self) {}
    fn resume_physics(&self) {}
}

/// Breakthrough cinematic state machine.
pub struct Director {
    phase: Phase,
    variant: Option<AnimationVariant>,
    quality_tier: QualityTier,
    safe_mode: bool,
    physics_paused: bool,
    fps: FpsMonitor,
    selector: Box<dyn VariantSelector>,
    physics: Box<dyn PhysicsControl>,
    events: broadcast::Sender<DirectorEvent>,
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("phase", &self.phase)
            .field("variant", &self.variant)
            .field("quality_tier", &self.quality_tier)
            .field("safe_mode", &self.safe_mode)
            .field("physics_paused", &self.physics_paused)
            .finish()
    }
}

impl Director {
    /// Create a director with the built-in selector and no physics.
    pub fn new(config: &DirectorConfig) -> Self {
        Self::with_parts(config, Box::new(MutationSelector), Box::new(NoopPhysics))
    }

    /// Create a director with explicit selector and physics hooks.
    pub fn with_parts(
        config: &DirectorConfig,
        selector: Box<dyn VariantSelector>,
        physics: Box<dyn PhysicsControl>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            phase: Phase::Idle,
            variant: None,
            quality_tier: QualityTier::Mid,
            safe_mode: false,
            physics_paused: false,
            fps: FpsMonitor::new(config),
            selector,
            physics,
            events,
        }
    }

    /// Receive lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<DirectorEvent> {
        self.events.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Snapshot of phase, variant and degradation status.
    pub fn state(&self) -> DirectorState {
        DirectorState {
            phase: self.phase,
            variant: self.variant.clone(),
            is_safe_mode: self.safe_mode,
            quality_tier: self.quality_tier,
        }
    }

    /// Select and cache the variant for the upcoming cinematic.
    ///
    /// Allowed from `idle`, or from `complete` which resets first. A selector
    /// failure aborts with reason `error:<cause>`.
    pub fn prewarm(&mut self, request: PrewarmRequest) -> DirectorResult<AnimationVariant> {
        match self.phase {
            Phase::Idle => {}
            Phase::Complete => self.reset()?,
            phase => return Err(self.reject("prewarm", phase)),
        }

        self.quality_tier = request.quality_tier;
        self.safe_mode = request.quality_tier == QualityTier::Low;
        self.variant = None;
        self.fps.clear();
        self.set_phase(Phase::Prewarm);

        let selection = self.selector.select(&VariantRequest {
            entities: request.entities,
            breakthrough_type: request.breakthrough_type,
            quality_tier: Some(request.quality_tier),
            reduced_motion: request.reduced_motion,
            safe_mode: self.safe_mode,
        });

        match selection {
            Ok(variant) => {
                info!(
                    variant = %variant.id,
                    tier = %self.quality_tier,
                    safe_mode = self.safe_mode,
                    "Variant prewarmed"
                );
                self.variant = Some(variant.clone());
                Ok(variant)
            }
            Err(e) => {
                warn!(error = %e, "Variant selection failed");
                self.abort(&format!("error:{}", e));
                Err(DirectorError::VariantSelection {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Start playback. Uses `variant` if given, else the prewarmed one.
    ///
    /// Requires a prior successful [`prewarm`](Self::prewarm).
    pub fn play(
        &mut self,
        variant: Option<AnimationVariant>,
        quality_tier: QualityTier,
    ) -> DirectorResult<()> {
        match self.phase {
            Phase::Prewarm => {}
            Phase::Idle => {
                self.emit(DirectorEvent::Rejected {
                    operation: "play",
                    phase: Phase::Idle,
                });
                warn!("Play requested without prewarm");
                return Err(DirectorError::NotPrewarmed);
            }
            phase => return Err(self.reject("play", phase)),
        }

        if let Some(variant) = variant {
            self.variant = Some(variant);
        }
        if self.variant.is_none() {
            return Err(DirectorError::NotPrewarmed);
        }
        if quality_tier == QualityTier::Low {
            self.safe_mode = true;
        }
        self.quality_tier = quality_tier;

        self.physics.pause_physics();
        self.physics_paused = true;
        self.set_phase(Phase::Play);
        Ok(())
    }

    /// Move from `play` into the closing `settle` phase.
    pub fn settle(&mut self) -> DirectorResult<()> {
        match self.phase {
            Phase::Play => {
                self.set_phase(Phase::Settle);
                Ok(())
            }
            phase => Err(self.reject("settle", phase)),
        }
    }

    /// Finish the cinematic. From `play` this passes through `settle`.
    pub fn complete(&mut self) -> DirectorResult<()> {
        match self.phase {
            Phase::Play => self.settle()?,
            Phase::Settle => {}
            phase => return Err(self.reject("complete", phase)),
        }

        self.resume_physics();
        self.fps.clear();
        self.set_phase(Phase::Complete);
        self.emit(DirectorEvent::Completed);
        info!(variant = ?self.variant.as_ref().map(|v| &v.id), "Breakthrough complete");
        Ok(())
    }

    /// Return from `complete` to `idle`. A no-op when already idle.
    pub fn reset(&mut self) -> DirectorResult<()> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Complete => {
                self.variant = None;
                self.set_phase(Phase::Idle);
                Ok(())
            }
            phase => Err(self.reject("reset", phase)),
        }
    }

    /// Cancel from any non-idle phase. Returns false if already idle.
    pub fn abort(&mut self, reason: &str) -> bool {
        let from = self.phase;
        if from == Phase::Idle {
            debug!(reason, "Abort ignored while idle");
            return false;
        }

        self.resume_physics();
        self.fps.clear();
        self.variant = None;
        warn!(reason, from = %from, "Breakthrough aborted");
        self.emit(DirectorEvent::Aborted {
            reason: reason.to_string(),
            from,
        });
        self.set_phase(Phase::Idle);
        true
    }

    /// Feed a frame-rate sample taken during playback.
    ///
    /// Safe mode engages once the rolling average drops below threshold and
    /// stays on until the next prewarm. Returns the current safe-mode flag.
    pub fn report_fps(&mut self, fps: f64) -> bool {
        if self.phase != Phase::Play {
            return self.safe_mode;
        }
        self.fps.push(fps);

        if !self.safe_mode && self.fps.is_degraded() {
            let average_fps = self.fps.average().unwrap_or(fps);
            self.safe_mode = true;
            warn!(average_fps, "Frame rate degraded, engaging safe mode");
            self.emit(DirectorEvent::SafeModeEngaged { average_fps });
        }
        self.safe_mode
    }

    fn resume_physics(&mut self) {
        if self.physics_paused {
            self.physics.resume_physics();
            self.physics_paused = false;
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "Director phase change");
        self.phase = phase;
        self.emit(DirectorEvent::PhaseChanged { phase });
    }

    fn reject(&self, operation: &'static str, phase: Phase) -> DirectorError {
        warn!(operation, phase = %phase, "Director call rejected");
        self.emit(DirectorEvent::Rejected { operation, phase });
        DirectorError::InvalidTransition { operation, phase }
    }

    fn emit(&self, event: DirectorEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
