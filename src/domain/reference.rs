//! Growth reference tables and interpolation.
//!
//! A [`ReferenceTable`] holds (median, sd) pairs for one growth metric,
//! indexed by age in months and partitioned by sex. Lookups are exact at
//! tabulated ages and piecewise-linear in between; median and sd are
//! interpolated independently.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Biological sex used to select the reference partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Single-letter code used in storage and reference files.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "boy" | "laki-laki" | "l" => Ok(Self::Male),
            "f" | "female" | "girl" | "perempuan" | "p" => Ok(Self::Female),
            other => Err(format!("Unknown sex '{other}' (expected M or F)")),
        }
    }
}

impl TryFrom<String> for Sex {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sex> for String {
    fn from(sex: Sex) -> Self {
        sex.code().to_string()
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// Which anthropometric index a table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMetric {
    HeightForAge,
    WeightForAge,
}

impl fmt::Display for GrowthMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeightForAge => write!(f, "height-for-age"),
            Self::WeightForAge => write!(f, "weight-for-age"),
        }
    }
}

/// Integrity violations detected while building a reference table.
///
/// These are fatal at startup: a table that fails here would otherwise
/// produce NaN or infinite z-scores downstream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("Reference table is empty")]
    Empty,

    #[error("Non-positive sd {sd} at age {age} ({sex})")]
    InvalidSd { age: f64, sex: Sex, sd: f64 },

    #[error("Non-finite value at age {age} ({sex})")]
    NonFinite { age: f64, sex: Sex },

    #[error("Negative age {age} ({sex})")]
    NegativeAge { age: f64, sex: Sex },

    #[error("Duplicate age {age} for {sex}")]
    DuplicateAge { age: f64, sex: Sex },

    #[error("Failed to read reference data: {0}")]
    Read(String),

    #[error("Malformed reference data: {0}")]
    Format(String),
}

/// One row of a reference dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Age in months
    #[serde(rename = "age_month", alias = "age")]
    pub age: f64,
    pub sex: Sex,
    pub median: f64,
    pub sd: f64,
}

impl ReferencePoint {
    #[must_use]
    pub fn new(age: f64, sex: Sex, median: f64, sd: f64) -> Self {
        Self {
            age,
            sex,
            median,
            sd,
        }
    }

    #[must_use]
    pub fn stats(&self) -> ReferenceStats {
        ReferenceStats {
            median: self.median,
            sd: self.sd,
        }
    }

    fn check(&self) -> Result<(), ReferenceError> {
        if !(self.age.is_finite() && self.median.is_finite() && self.sd.is_finite()) {
            return Err(ReferenceError::NonFinite {
                age: self.age,
                sex: self.sex,
            });
        }
        if self.age < 0.0 {
            return Err(ReferenceError::NegativeAge {
                age: self.age,
                sex: self.sex,
            });
        }
        if self.sd <= 0.0 {
            return Err(ReferenceError::InvalidSd {
                age: self.age,
                sex: self.sex,
                sd: self.sd,
            });
        }
        Ok(())
    }
}

/// Median and standard deviation at a given age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub median: f64,
    pub sd: f64,
}

impl ReferenceStats {
    /// Value lying `k` standard deviations from the median.
    #[must_use]
    pub fn band(&self, k: f64) -> f64 {
        self.median + k * self.sd
    }

    /// Standardized deviation of `observed` from the median.
    #[must_use]
    pub fn z_score(&self, observed: f64) -> f64 {
        (observed - self.median) / self.sd
    }
}

/// Immutable, validated reference table.
///
/// Points are stored per sex, sorted by age with no duplicates. Every sd is
/// strictly positive and every value finite.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    male: Vec<ReferencePoint>,
    female: Vec<ReferencePoint>,
}

impl ReferenceTable {
    /// Build a table from unordered points, enforcing integrity.
    ///
    /// # Errors
    /// Returns `ReferenceError` if the set is empty, any value is non-finite
    /// or negative, any sd is not positive, or an age repeats within a sex.
    pub fn new(points: Vec<ReferencePoint>) -> Result<Self, ReferenceError> {
        if points.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let mut male = Vec::new();
        let mut female = Vec::new();
        for point in points {
            point.check()?;
            match point.sex {
                Sex::Male => male.push(point),
                Sex::Female => female.push(point),
            }
        }

        for partition in [&mut male, &mut female] {
            partition.sort_by(|a, b| a.age.total_cmp(&b.age));
            if let Some(dup) = partition.windows(2).find(|w| w[0].age == w[1].age) {
                return Err(ReferenceError::DuplicateAge {
                    age: dup[1].age,
                    sex: dup[1].sex,
                });
            }
        }

        Ok(Self { male, female })
    }

    /// Tabulated points for one sex, ascending by age.
    #[must_use]
    pub fn points(&self, sex: Sex) -> &[ReferencePoint] {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }

    /// Youngest and oldest tabulated ages for a sex.
    #[must_use]
    pub fn coverage(&self, sex: Sex) -> Option<(f64, f64)> {
        let points = self.points(sex);
        Some((points.first()?.age, points.last()?.age))
    }

    /// Interpolated (median, sd) at `age_months`.
    ///
    /// Returns `None` when the sex has no rows or the age is not bracketed
    /// by tabulated points. Values are never extrapolated.
    #[must_use]
    pub fn lookup(&self, sex: Sex, age_months: f64) -> Option<ReferenceStats> {
        if !age_months.is_finite() {
            return None;
        }
        let points = self.points(sex);

        let idx = points.binary_search_by(|p| {
            p.age.partial_cmp(&age_months).unwrap_or(Ordering::Less)
        });
        match idx {
            Ok(i) => Some(points[i].stats()),
            Err(i) if i == 0 || i == points.len() => None,
            Err(i) => {
                let lower = &points[i - 1];
                let upper = &points[i];
                let t = (age_months - lower.age) / (upper.age - lower.age);
                Some(ReferenceStats {
                    median: lower.median + (upper.median - lower.median) * t,
                    sd: lower.sd + (upper.sd - lower.sd) * t,
                })
            }
        }
    }
}
