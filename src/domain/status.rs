//! Nutrition status categories.
//!
//! One enumeration shared by the rule-based z-score classifier and the
//! predictive model decoder, so both always speak the same labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity category for a growth z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionStatus {
    /// Within standard
    Normal,
    /// Below standard, consultation advised
    Risk,
    /// Far below standard (stunted), clinical consultation strongly advised
    Severe,
}

impl NutritionStatus {
    /// All categories in model label-index order.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Risk, Self::Severe];

    /// Human-readable guidance shown next to a result.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Normal => "Within standard",
            Self::Risk => "Below standard - consultation with a health worker advised",
            Self::Severe => "Far below standard - clinical consultation strongly advised",
        }
    }

    /// Stable code used in the history ledger.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Risk => "risk",
            Self::Severe => "severe",
        }
    }

    /// Label used by the predictive model artifact.
    #[must_use]
    pub fn model_label(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Risk => "Risk",
            Self::Severe => "Stunted",
        }
    }

    /// Resolve a model label, including the dataset's original spellings.
    #[must_use]
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "normal" | "not stunted" => Some(Self::Normal),
            "risk" | "berisiko" | "at risk" => Some(Self::Risk),
            "stunted" | "severe" | "severely stunted" => Some(Self::Severe),
            _ => None,
        }
    }
}

impl FromStr for NutritionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| format!("Unknown nutrition status code '{s}'"))
    }
}

impl fmt::Display for NutritionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Risk => write!(f, "RISK"),
            Self::Severe => write!(f, "SEVERE"),
        }
    }
}

/// Map a z-score onto its severity band.
///
/// `z <= -3` is Severe, `-3 < z < -2` is Risk, anything else Normal.
/// Independent of the metric that produced the score.
#[must_use]
pub fn classify(z: f64) -> NutritionStatus {
    if z <= -3.0 {
        NutritionStatus::Severe
    } else if z < -2.0 {
        NutritionStatus::Risk
    } else {
        NutritionStatus::Normal
    }
}

/// Classify the worse of the weight-for-age and height-for-age scores.
///
/// This is how the training labels for the predictive model are derived.
#[must_use]
pub fn combined_status(weight_z: f64, height_z: f64) -> NutritionStatus {
    classify(weight_z.min(height_z))
}

/// Output of the predictive classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub status: NutritionStatus,

    /// Highest class probability (0.0 to 1.0)
    pub confidence: f64,
}
