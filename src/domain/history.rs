//! History records.

use serde::{Deserialize, Serialize};

use super::measurement::Measurement;
use super::status::NutritionStatus;

/// A stored evaluation: the measurement plus its height-for-age status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub measurement: Measurement,
    pub status: NutritionStatus,
}

impl HistoryRecord {
    #[must_use]
    pub fn new(measurement: Measurement, status: NutritionStatus) -> Self {
        Self {
            measurement,
            status,
        }
    }

    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status.description()
    }
}

/// Order records for display: by age, then by time of entry.
pub fn sort_by_age(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| {
        a.measurement
            .age_months
            .cmp(&b.measurement.age_months)
            .then(a.measurement.recorded_at.cmp(&b.measurement.recorded_at))
    });
}
