//! # aSpiral Reflection
//!
//! Conversation-stage engine and breakthrough director for guided
//! self-reflection. A user describes something that feels stuck; the engine
//! asks at most a few short, non-repetitive questions, decides when to stop,
//! and hands a synthesized breakthrough to a cinematic director.
//!
//! ## Features
//!
//! - **Fast-track stages**: friction -> desire -> blocker -> breakthrough, capped at three questions
//! - **Stop policy**: cap, "I don't know" turns, strong patterns, skip requests, repetition
//! - **Frustration detection**: skip and annoyance phrases short-circuit to synthesis
//! - **Pattern library + energy matching**: question categories per stage, tone-matched wording
//! - **Anti-repetition**: start-word, fingerprint and opening checks over recent questions
//! - **Breakthrough director**: prewarm/play/settle/complete lifecycle with safe mode
//! - **OmniLink**: optional outbound webhook with circuit breaker
//!
//! ## Architecture
//!
//! ```text
//! user turn -> ReflectionFlow -> StageEngine -> QuestionGenerator (Langbase | scripted)
//!                   |
//!                   +-> BreakthroughReady -> host -> Director -> renderer events
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use aspiral_reflection::{Config, ReflectionFlow, TurnOutcome};
//! use aspiral_reflection::generation::ScriptedGenerator;
//! use aspiral_reflection::session::MemorySessionStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let mut flow = ReflectionFlow::new(&config, MemorySessionStore::new(), ScriptedGenerator::new());
//!     if let TurnOutcome::Question { text, .. } = flow.handle_turn("work is eating me alive").await? {
//!         println!("{text}");
//!     }
//!     Ok(())
//! }
//! ```

/// Anti-repetition engine for generated questions.
pub mod anti_repetition;
/// Environment-driven configuration.
pub mod config;
/// Breakthrough director lifecycle, variant selection and safe mode.
pub mod director;
/// Error types and result aliases.
pub mod error;
/// Per-turn reflection flow.
pub mod flow;
/// Frustration and skip detection.
pub mod frustration;
/// Question generation boundary and implementations.
pub mod generation;
/// Langbase Pipes client.
pub mod langbase;
/// Optional OmniLink webhook integration.
pub mod omnilink;
/// Question pattern library and energy matching.
pub mod patterns;
/// Prompt text for Langbase pipes.
pub mod prompts;
/// Session store.
pub mod session;
/// Fast-track stage engine.
pub mod stage;

pub use config::Config;
pub use director::{Director, DirectorEvent, Phase};
pub use error::{AppError, AppResult};
pub use flow::{ReflectionFlow, TurnOutcome};
