//! Z-score evaluation against a reference table.

use serde::{Deserialize, Serialize};

use super::reference::{GrowthMetric, ReferenceStats, ReferenceTable, Sex};
use super::status::{classify, NutritionStatus};

/// Standardized score of `observed` at `age_months`.
///
/// Returns `None` when the table does not cover the age for this sex.
#[must_use]
pub fn z_score(observed: f64, age_months: f64, sex: Sex, table: &ReferenceTable) -> Option<f64> {
    table
        .lookup(sex, age_months)
        .map(|stats| stats.z_score(observed))
}

/// A measurement scored against one reference metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthAssessment {
    pub metric: GrowthMetric,

    /// Observed value (cm or kg depending on metric)
    pub observed: f64,

    /// Interpolated reference at the child's age
    pub reference: ReferenceStats,

    pub z_score: f64,

    pub status: NutritionStatus,
}

impl GrowthAssessment {
    /// Score and classify an observation.
    ///
    /// Returns `None` when the age is outside the table's coverage.
    #[must_use]
    pub fn evaluate(
        metric: GrowthMetric,
        observed: f64,
        age_months: f64,
        sex: Sex,
        table: &ReferenceTable,
    ) -> Option<Self> {
        let reference = table.lookup(sex, age_months)?;
        let z_score = reference.z_score(observed);
        Some(Self {
            metric,
            observed,
            reference,
            z_score,
            status: classify(z_score),
        })
    }

    /// Status text stored in history alongside the measurement.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status.description()
    }
}
