//! In-memory adapter: Implementation of HistoryStore for tests and
//! ephemeral runs.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{normalize_name, HistoryRecord};
use crate::ports::HistoryStore;

use super::StorageError;

/// Ledger held in process memory.
///
/// Appends take the write lock, fetches the read lock, so a fetch never
/// observes a half-applied append.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    ledger: RwLock<HashMap<String, Vec<HistoryRecord>>>,
}

impl InMemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct children with at least one record.
    ///
    /// # Errors
    /// Returns `StorageError::LockPoisoned` if a writer panicked.
    pub fn children(&self) -> Result<usize, StorageError> {
        let ledger = self.ledger.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(ledger.len())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    type Error = StorageError;

    fn append(&self, record: &HistoryRecord) -> Result<(), Self::Error> {
        let key = normalize_name(&record.measurement.child_name);
        if key.is_empty() {
            return Err(StorageError::InvalidRecord("empty child name".into()));
        }

        let mut stored = record.clone();
        stored.measurement.child_name.clone_from(&key);

        let mut ledger = self.ledger.write().map_err(|_| StorageError::LockPoisoned)?;
        ledger.entry(key).or_default().push(stored);
        Ok(())
    }

    fn fetch(&self, child_name: &str) -> Result<Vec<HistoryRecord>, Self::Error> {
        let ledger = self.ledger.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(ledger
            .get(&normalize_name(child_name))
            .cloned()
            .unwrap_or_default())
    }
}
