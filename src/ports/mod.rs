//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the evaluation engine and its collaborators (ledger, model).

mod history;
mod predictor;

pub use history::HistoryStore;
pub use predictor::{ModelError, StatusPredictor};
