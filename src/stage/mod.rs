//! Fast-track conversation stage engine.
//!
//! - [`catalog`]: behavioral pattern catalog and early pattern detection
//! - [`engine`]: stage chain, stop policy and the per-session [`StageEngine`]
//!
//! The engine prepares prompts and decisions only. Question text comes from a
//! [`crate::generation::QuestionGenerator`], and a [`BreakthroughReady`] value
//! is returned for the caller to forward to the director.

mod catalog;
mod engine;

pub use catalog::*;
pub use engine::*;
