//! Question pattern library and energy matching.
//!
//! - [`library`]: rhetorical categories, their templates and the stage mapping
//! - [`energy`]: tone classification and tone-specific question rewrites

mod energy;
mod library;

pub use energy::*;
pub use library::*;
