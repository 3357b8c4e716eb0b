//! Reference file adapter: loads a growth reference table from JSON.
//!
//! The file is an array of rows `{ "age_month", "sex", "median", "sd" }`,
//! one per measured (age, sex) pair. Integrity is checked by
//! [`ReferenceTable::new`]; any violation aborts the load.

use std::path::Path;

use crate::domain::{ReferenceError, ReferencePoint, ReferenceTable};

/// Load and validate a reference table.
///
/// # Errors
/// Returns `ReferenceError::Read` or `ReferenceError::Format` when the file
/// cannot be read or parsed, or an integrity error for bad rows.
pub fn load_reference_table(path: &Path) -> Result<ReferenceTable, ReferenceError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReferenceError::Read(format!("{}: {e}", path.display())))?;
    let table = parse_reference_table(&content)?;

    tracing::info!("Loaded reference table from {:?}", path);
    Ok(table)
}

/// Parse and validate a reference table from JSON text.
///
/// # Errors
/// Returns `ReferenceError::Format` for malformed JSON, or an integrity
/// error for bad rows.
pub fn parse_reference_table(json: &str) -> Result<ReferenceTable, ReferenceError> {
    let rows: Vec<ReferencePoint> =
        serde_json::from_str(json).map_err(|e| ReferenceError::Format(e.to_string()))?;
    ReferenceTable::new(rows)
}
