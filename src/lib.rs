//! # NutriSense
//!
//! Growth-reference evaluation engine for child nutrition screening.
//!
//! This crate provides:
//! - WHO reference tables with piecewise-linear interpolation by age
//! - Z-score evaluation and three-band status classification
//! - An append-only per-child measurement ledger
//! - Trend chart input assembly
//! - A boundary for the offline-trained status predictor
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure logic (reference tables, z-scores, status)
//! - `ports`: Trait definitions for the ledger and the predictor
//! - `adapters`: Concrete implementations (SQLite, in-memory, random forest)
//! - `application`: The evaluation pipeline orchestrating domain and ports
//! - `config` / `cli`: Runtime configuration and command-line surface

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{Evaluation, GrowthService};
pub use domain::{GrowthMetric, HistoryRecord, Measurement, NutritionStatus, ReferenceTable, Sex};

/// Result type for NutriSense operations
pub type Result<T> = std::result::Result<T, NutrisenseError>;

/// Main error type for NutriSense
#[derive(Debug, thiserror::Error)]
pub enum NutrisenseError {
    #[error("Invalid measurement: {0}")]
    Validation(String),

    #[error("Reference unavailable for this age: {metric} at {age_months} months ({sex})")]
    Coverage {
        metric: domain::GrowthMetric,
        sex: domain::Sex,
        age_months: u32,
    },

    #[error("Reference data integrity violation: {0}")]
    DataIntegrity(#[from] domain::ReferenceError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    /// The evaluation succeeded but could not be written to history.
    /// The computed result is carried so callers can still show it.
    #[error("Evaluation was not recorded: {source}")]
    Persistence {
        evaluation: Box<application::Evaluation>,
        #[source]
        source: adapters::StorageError,
    },
}
