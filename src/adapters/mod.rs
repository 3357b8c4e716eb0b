//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: durable growth ledger
//! - `memory`: in-process ledger for tests and dry runs
//! - `forest`: exported random-forest status predictor
//! - `reference`: JSON reference table loader
//! - `sanitize`: child-identifier filtering for logs

pub mod forest;
pub mod memory;
pub mod reference;
pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
