//! Input assembly for the growth trend chart.
//!
//! The renderer itself lives outside this crate. It receives five reference
//! curves, the child's history ordered by age and the current observation.

use serde::{Deserialize, Serialize};

use super::history::{sort_by_age, HistoryRecord};
use super::measurement::Measurement;
use super::reference::{ReferenceTable, Sex};

/// Reference band drawn on the chart, as an offset in sd from the median.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Minus3Sd,
    Minus2Sd,
    Median,
    Plus2Sd,
    Plus3Sd,
}

impl Band {
    pub const ALL: [Self; 5] = [
        Self::Median,
        Self::Minus2Sd,
        Self::Minus3Sd,
        Self::Plus2Sd,
        Self::Plus3Sd,
    ];

    #[must_use]
    pub fn offset(&self) -> f64 {
        match self {
            Self::Minus3Sd => -3.0,
            Self::Minus2Sd => -2.0,
            Self::Median => 0.0,
            Self::Plus2Sd => 2.0,
            Self::Plus3Sd => 3.0,
        }
    }
}

/// Tabulated reference row for the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub age_month: f64,
    pub median: f64,
    pub sd: f64,
}

/// One reference curve as (age_month, value) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCurve {
    pub band: Band,
    pub points: Vec<(f64, f64)>,
}

/// Child observation plotted on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub age_month: u32,
    pub height_cm: f64,
}

impl From<&Measurement> for TrendPoint {
    fn from(m: &Measurement) -> Self {
        Self {
            age_month: m.age_months,
            height_cm: m.height_cm,
        }
    }
}

/// Everything the trend renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendChart {
    pub sex: Sex,
    pub reference: Vec<ReferenceRow>,
    pub curves: Vec<ReferenceCurve>,
    pub history: Vec<TrendPoint>,
    pub current: TrendPoint,
}

impl TrendChart {
    /// Assemble chart input from a table, a child's records and the
    /// current measurement. Records are reordered by age.
    #[must_use]
    pub fn build(
        table: &ReferenceTable,
        current: &Measurement,
        mut history: Vec<HistoryRecord>,
    ) -> Self {
        let sex = current.sex;
        let points = table.points(sex);
        let reference: Vec<ReferenceRow> = points
            .iter()
            .map(|p| ReferenceRow {
                age_month: p.age,
                median: p.median,
                sd: p.sd,
            })
            .collect();

        let curves = Band::ALL
            .into_iter()
            .map(|band| ReferenceCurve {
                band,
                points: points
                    .iter()
                    .map(|p| (p.age, p.stats().band(band.offset())))
                    .collect(),
            })
            .collect();

        sort_by_age(&mut history);
        let history = history
            .iter()
            .map(|r| TrendPoint::from(&r.measurement))
            .collect();

        Self {
            sex,
            reference,
            curves,
            history,
            current: TrendPoint::from(current),
        }
    }

    #[must_use]
    pub fn curve(&self, band: Band) -> Option<&ReferenceCurve> {
        self.curves.iter().find(|c| c.band == band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::ReferencePoint;
    use crate::domain::NutritionStatus;

    fn table() -> ReferenceTable {
        ReferenceTable::new(vec![
            ReferencePoint::new(24.0, Sex::Male, 85.0, 3.5),
            ReferencePoint::new(12.0, Sex::Male, 75.0, 3.0),
            ReferencePoint::new(12.0, Sex::Female, 74.0, 2.5),
        ])
        .expect("Valid table")
    }

    #[test]
    fn test_five_curves_from_reference() {
        let current = Measurement::new("Budi", 14, Sex::Male, 76.0, 9.5);
        let chart = TrendChart::build(&table(), &current, Vec::new());

        assert_eq!(chart.reference.len(), 2);
        assert_eq!(chart.curves.len(), 5);

        let minus3 = chart.curve(Band::Minus3Sd).expect("Curve present");
        assert_eq!(minus3.points, vec![(12.0, 66.0), (24.0, 74.5)]);
        let plus2 = chart.curve(Band::Plus2Sd).expect("Curve present");
        assert_eq!(plus2.points, vec![(12.0, 81.0), (24.0, 92.0)]);
    }

    #[test]
    fn test_history_sorted_and_current_kept() {
        let later = Measurement::new("Budi", 14, Sex::Male, 76.0, 9.5);
        let earlier = Measurement::new("Budi", 10, Sex::Male, 72.0, 8.9);
        let history = vec![
            HistoryRecord::new(later.clone(), NutritionStatus::Normal),
            HistoryRecord::new(earlier, NutritionStatus::Normal),
        ];

        let chart = TrendChart::build(&table(), &later, history);
        let ages: Vec<u32> = chart.history.iter().map(|p| p.age_month).collect();
        assert_eq!(ages, vec![10, 14]);
        assert_eq!(chart.current.age_month, 14);
        assert!((chart.current.height_cm - 76.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_other_sex_rows_ignored() {
        let current = Measurement::new("Ana", 12, Sex::Female, 70.0, 8.0);
        let chart = TrendChart::build(&table(), &current, Vec::new());
        assert_eq!(chart.reference.len(), 1);
        assert_eq!(chart.sex, Sex::Female);
    }
}
