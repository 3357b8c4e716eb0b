//! SQLite adapter: Implementation of HistoryStore.
//!
//! Provides the durable, append-only growth ledger.
//!
//! # Concurrency
//!
//! Each insert is a single autocommit statement, so a record is either fully
//! written or absent. Within a process the connection sits behind a `Mutex`;
//! across processes SQLite's file lock serializes writers and the busy
//! timeout makes a blocked writer wait instead of failing. File databases run
//! in WAL mode so readers always see a committed snapshot.
//!
//! # Append-only
//!
//! Triggers reject `UPDATE` and `DELETE` on the ledger table.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection};

use crate::domain::{normalize_name, HistoryRecord, Measurement, NutritionStatus, Sex};
use crate::ports::HistoryStore;

/// Default time a writer waits for a competing lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt ledger row {row_id}: {reason}")]
    CorruptRow { row_id: i64, reason: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// SQLite-backed history ledger.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

/// Raw ledger row before domain conversion.
struct LedgerRow {
    id: i64,
    child_name: String,
    age_month: i64,
    sex: String,
    height: f64,
    weight: f64,
    who_status: String,
    timestamp: String,
}

impl LedgerRow {
    fn into_record(self) -> Result<HistoryRecord, StorageError> {
        let row_id = self.id;
        let corrupt = move |reason: String| StorageError::CorruptRow { row_id, reason };

        let age_months = u32::try_from(self.age_month)
            .map_err(|_| corrupt(format!("age_month {}", self.age_month)))?;
        let sex: Sex = self.sex.parse().map_err(corrupt)?;
        let status: NutritionStatus = self.who_status.parse().map_err(corrupt)?;
        let recorded_at = chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| corrupt(format!("timestamp: {e}")))?;

        Ok(HistoryRecord::new(
            Measurement {
                child_name: self.child_name,
                age_months,
                sex,
                height_cm: self.height,
                weight_kg: self.weight,
                recorded_at,
            },
            status,
        ))
    }
}

impl SqliteHistoryStore {
    /// Open (or create) a ledger at the given path.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        tracing::debug!("Opened history ledger (journal_mode={})", mode);

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory ledger (for testing).
    ///
    /// # Errors
    /// Returns error if the database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS growth_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                child_name TEXT NOT NULL,
                age_month INTEGER NOT NULL,
                sex TEXT NOT NULL,
                height REAL NOT NULL,
                weight REAL NOT NULL,
                who_status TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_growth_history_child
                ON growth_history(child_name);

            CREATE TRIGGER IF NOT EXISTS growth_history_no_update
                BEFORE UPDATE ON growth_history
            BEGIN
                SELECT RAISE(ABORT, 'growth_history is append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS growth_history_no_delete
                BEFORE DELETE ON growth_history
            BEGIN
                SELECT RAISE(ABORT, 'growth_history is append-only');
            END;
            ",
        )?;

        Ok(())
    }

    /// Total number of records across all children.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn count(&self) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM growth_history", [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl HistoryStore for SqliteHistoryStore {
    type Error = StorageError;

    fn append(&self, record: &HistoryRecord) -> Result<(), Self::Error> {
        let key = normalize_name(&record.measurement.child_name);
        if key.is_empty() {
            return Err(StorageError::InvalidRecord("empty child name".into()));
        }

        let m = &record.measurement;
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO growth_history (
                child_name, age_month, sex, height, weight, who_status, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                key,
                i64::from(m.age_months),
                m.sex.code(),
                m.height_cm,
                m.weight_kg,
                record.status.code(),
                m.recorded_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!(
            "Appended history row {} (age_month={}, status={})",
            conn.last_insert_rowid(),
            m.age_months,
            record.status
        );
        Ok(())
    }

    fn fetch(&self, child_name: &str) -> Result<Vec<HistoryRecord>, Self::Error> {
        let key = normalize_name(child_name);
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r"
            SELECT id, child_name, age_month, sex, height, weight, who_status, timestamp
            FROM growth_history
            WHERE child_name = ?1
            ORDER BY id
            ",
        )?;

        let rows = stmt
            .query_map(params![key], |row| {
                Ok(LedgerRow {
                    id: row.get(0)?,
                    child_name: row.get(1)?,
                    age_month: row.get(2)?,
                    sex: row.get(3)?,
                    height: row.get(4)?,
                    weight: row.get(5)?,
                    who_status: row.get(6)?,
                    timestamp: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(LedgerRow::into_record).collect()
    }
}
