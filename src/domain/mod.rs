//! Domain layer: Core growth-reference types and logic.
//!
//! Everything here is pure and in-memory. Reference tables are validated
//! on construction and safe to share between threads.

mod growth;
mod history;
mod measurement;
mod reference;
mod status;
mod trend;
pub mod who;

pub use growth::{z_score, GrowthAssessment};
pub use history::{sort_by_age, HistoryRecord};
pub use measurement::{
    age_in_years, normalize_name, Measurement, PredictorFeatures, FEATURE_NAMES, MAX_AGE_MONTHS,
    MAX_HEIGHT_CM, MAX_WEIGHT_KG,
};
pub use reference::{
    GrowthMetric, ReferenceError, ReferencePoint, ReferenceStats, ReferenceTable, Sex,
};
pub use status::{classify, combined_status, NutritionStatus, Prediction};
pub use trend::{Band, ReferenceCurve, ReferenceRow, TrendChart, TrendPoint};
