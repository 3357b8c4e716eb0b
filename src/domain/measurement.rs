//! Child measurement types.
//!
//! Bounds follow the intake form of the screening tool: ages up to five
//! years, weight up to 30 kg and height up to 150 cm.

use serde::{Deserialize, Serialize};

use super::reference::Sex;

/// Maximum supported age in months.
pub const MAX_AGE_MONTHS: u32 = 60;

/// Maximum accepted weight in kg.
pub const MAX_WEIGHT_KG: f64 = 30.0;

/// Maximum accepted height in cm.
pub const MAX_HEIGHT_CM: f64 = 150.0;

/// Canonical identity key for a child's free-text name.
///
/// Surrounding whitespace is trimmed and the result lowercased, so
/// "Ana ", "ana" and " ANA" all refer to the same child.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One observation of a child, as entered at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Normalized child name (see [`normalize_name`])
    pub child_name: String,

    /// Age in whole months (0-60)
    pub age_months: u32,

    pub sex: Sex,

    /// Height or length in cm (0-150)
    pub height_cm: f64,

    /// Weight in kg (0-30)
    pub weight_kg: f64,

    /// Time of the evaluation
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl Measurement {
    /// Create a measurement stamped with the current time.
    ///
    /// The name is normalized; call [`Measurement::validate`] before use.
    #[must_use]
    pub fn new(
        child_name: &str,
        age_months: u32,
        sex: Sex,
        height_cm: f64,
        weight_kg: f64,
    ) -> Self {
        Self {
            child_name: normalize_name(child_name),
            age_months,
            sex,
            height_cm,
            weight_kg,
            recorded_at: chrono::Utc::now(),
        }
    }

    /// Override the timestamp (used when replaying stored records).
    #[must_use]
    pub fn at(mut self, recorded_at: chrono::DateTime<chrono::Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    /// Validate identity and ranges.
    ///
    /// # Errors
    /// Returns every violation found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.child_name.is_empty() {
            errors.push("Child name is required".to_string());
        }
        if self.age_months > MAX_AGE_MONTHS {
            errors.push(format!(
                "Age {} months out of range [0, {MAX_AGE_MONTHS}]",
                self.age_months
            ));
        }
        if !self.height_cm.is_finite() || !(0.0..=MAX_HEIGHT_CM).contains(&self.height_cm) {
            errors.push(format!(
                "Height {} cm out of range [0, {MAX_HEIGHT_CM}]",
                self.height_cm
            ));
        }
        if !self.weight_kg.is_finite() || !(0.0..=MAX_WEIGHT_KG).contains(&self.weight_kg) {
            errors.push(format!(
                "Weight {} kg out of range [0, {MAX_WEIGHT_KG}]",
                self.weight_kg
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Feature vector for the predictive classifier.
    #[must_use]
    pub fn features(&self) -> PredictorFeatures {
        PredictorFeatures::from_measurement(self)
    }
}

/// Input features for the predictive classifier, in model order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictorFeatures {
    /// Age in whole years, rounded half-to-even from months
    pub age_years: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
}

/// Feature names in the order the model consumes them.
pub const FEATURE_NAMES: [&str; 3] = ["age", "weight", "height"];

impl PredictorFeatures {
    #[must_use]
    pub fn from_measurement(m: &Measurement) -> Self {
        Self {
            age_years: age_in_years(m.age_months),
            weight_kg: m.weight_kg,
            height_cm: m.height_cm,
        }
    }

    /// Order matches [`FEATURE_NAMES`].
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![f64::from(self.age_years), self.weight_kg, self.height_cm]
    }
}

/// Convert months to whole years with ties rounded to even, matching the
/// rounding used when the model's training data was prepared.
#[must_use]
pub fn age_in_years(age_months: u32) -> u32 {
    (f64::from(age_months) / 12.0).round_ties_even() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Ana "), "ana");
        assert_eq!(normalize_name(" ANA"), "ana");
        assert_eq!(normalize_name("\tBudi Santoso\n"), "budi santoso");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_name("  Siti Nur ");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn test_validation() {
        let valid = Measurement::new("Budi", 24, Sex::Male, 86.0, 12.0);
        assert!(valid.validate().is_ok());

        let boundary = Measurement::new("Budi", 60, Sex::Male, 0.0, 30.0);
        assert!(boundary.validate().is_ok());

        let invalid = Measurement::new("  ", 61, Sex::Female, 151.0, f64::NAN);
        let errors = invalid.validate().expect_err("Should fail");
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("name"));
    }

    #[test]
    fn test_age_rounding() {
        assert_eq!(age_in_years(0), 0);
        assert_eq!(age_in_years(5), 0);
        // 6/12 = 0.5 rounds to even
        assert_eq!(age_in_years(6), 0);
        assert_eq!(age_in_years(7), 1);
        // 18/12 = 1.5 rounds to 2, 30/12 = 2.5 rounds to 2
        assert_eq!(age_in_years(18), 2);
        assert_eq!(age_in_years(30), 2);
        assert_eq!(age_in_years(42), 4);
        assert_eq!(age_in_years(60), 5);
    }

    #[test]
    fn test_features_vector_order() {
        let m = Measurement::new("Ana", 30, Sex::Female, 88.5, 11.2);
        let v = m.features().to_vec();
        assert_eq!(v.len(), FEATURE_NAMES.len());
        assert!((v[0] - 2.0).abs() < f64::EPSILON);
        assert!((v[1] - 11.2).abs() < f64::EPSILON);
        assert!((v[2] - 88.5).abs() < f64::EPSILON);
    }
}
