//! History port: Trait for the per-child measurement ledger.
//!
//! This trait abstracts the ledger backend (SQLite, in-memory) from the
//! application logic.

use crate::domain::{sort_by_age, HistoryRecord};

/// Append-only store of evaluations, keyed by normalized child name.
///
/// Implementations must:
/// - normalize names with [`crate::domain::normalize_name`] on both append and fetch
/// - never modify or remove a stored record
/// - serialize concurrent appends so none is lost
/// - have the record durable by the time `append` returns `Ok`
pub trait HistoryStore: Send + Sync {
    /// Error type for ledger operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append a record to the child's ledger.
    ///
    /// # Errors
    /// Returns error if the record could not be persisted.
    fn append(&self, record: &HistoryRecord) -> Result<(), Self::Error>;

    /// All records for a child, in no particular order.
    ///
    /// An unknown name yields an empty vector.
    ///
    /// # Errors
    /// Returns error if the ledger cannot be read.
    fn fetch(&self, child_name: &str) -> Result<Vec<HistoryRecord>, Self::Error>;

    /// Records for a child ordered by age for display.
    ///
    /// # Errors
    /// Returns error if the ledger cannot be read.
    fn fetch_sorted(&self, child_name: &str) -> Result<Vec<HistoryRecord>, Self::Error> {
        let mut records = self.fetch(child_name)?;
        sort_by_age(&mut records);
        Ok(records)
    }
}
