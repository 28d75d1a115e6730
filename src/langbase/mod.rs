//! Langbase Pipes client used by the question generator.
//!
//! Only the `/v1/pipes/run` endpoint is used. Pipes are provisioned outside
//! this crate and referenced by name from configuration.

mod client;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use client::LangbaseClient;
pub use types::*;
