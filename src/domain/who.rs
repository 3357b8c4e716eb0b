//! Built-in WHO child growth references.
//!
//! Yearly checkpoints (12..=60 months) taken from the WHO -2SD/+2SD bounds.
//! Median is the midpoint of the bounds and sd a quarter of their span.

use super::reference::{GrowthMetric, ReferenceError, ReferencePoint, ReferenceTable, Sex};

/// (age in years, -2SD, +2SD)
type Bounds = (u32, f64, f64);

const WEIGHT_FOR_AGE_MALE: [Bounds; 5] = [
    (1, 9.17, 10.83),
    (2, 11.22, 13.43),
    (3, 13.38, 16.40),
    (4, 15.15, 19.19),
    (5, 16.92, 21.65),
];

const WEIGHT_FOR_AGE_FEMALE: [Bounds; 5] = [
    (1, 8.62, 10.43),
    (2, 10.86, 13.19),
    (3, 12.86, 15.94),
    (4, 14.68, 18.70),
    (5, 16.43, 21.77),
];

const HEIGHT_FOR_AGE_MALE: [Bounds; 5] = [
    (1, 73.39, 78.71),
    (2, 83.97, 90.74),
    (3, 92.03, 99.75),
    (4, 98.47, 106.93),
    (5, 104.72, 113.64),
];

const HEIGHT_FOR_AGE_FEMALE: [Bounds; 5] = [
    (1, 72.09, 77.26),
    (2, 82.12, 88.76),
    (3, 90.41, 97.94),
    (4, 97.35, 105.76),
    (5, 103.46, 112.43),
];

fn points_from_bounds(sex: Sex, bounds: &[Bounds]) -> impl Iterator<Item = ReferencePoint> + '_ {
    bounds.iter().map(move |&(years, low, high)| {
        ReferencePoint::new(
            f64::from(years * 12),
            sex,
            (low + high) / 2.0,
            (high - low) / 4.0,
        )
    })
}

/// Built-in table for the given metric.
///
/// # Errors
/// Only fails if the embedded constants violate table integrity.
pub fn builtin_table(metric: GrowthMetric) -> Result<ReferenceTable, ReferenceError> {
    let (male, female) = match metric {
        GrowthMetric::HeightForAge => (&HEIGHT_FOR_AGE_MALE, &HEIGHT_FOR_AGE_FEMALE),
        GrowthMetric::WeightForAge => (&WEIGHT_FOR_AGE_MALE, &WEIGHT_FOR_AGE_FEMALE),
    };

    let points = points_from_bounds(Sex::Male, male)
        .chain(points_from_bounds(Sex::Female, female))
        .collect();
    ReferenceTable::new(points)
}
