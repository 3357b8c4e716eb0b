//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the engine.

mod evaluation;

pub use evaluation::{Evaluation, GrowthService};
