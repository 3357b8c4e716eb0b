//! Growth service: Orchestrates one evaluation.
//!
//! This service coordinates:
//! - Input validation
//! - Height-for-age (and optionally weight-for-age) scoring
//! - The predictive classifier
//! - History persistence
//! - Trend chart assembly

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapters::StorageError;
use crate::domain::{
    combined_status, GrowthAssessment, GrowthMetric, HistoryRecord, Measurement,
    NutritionStatus, Prediction, ReferenceTable, TrendChart,
};
use crate::ports::{HistoryStore, StatusPredictor};
use crate::{NutrisenseError, Result};

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub measurement: Measurement,

    /// Height-for-age result; its status is the one recorded in history
    pub height_for_age: GrowthAssessment,

    /// Guidance text for the height-for-age status
    pub status_text: String,

    /// Weight-for-age result, when a weight table is configured and covers
    /// the age
    pub weight_for_age: Option<GrowthAssessment>,

    /// Classification of the lower of the two z-scores
    pub combined_status: Option<NutritionStatus>,

    /// Predictive classifier output, when a model is configured
    pub prediction: Option<Prediction>,

    /// Why the configured model produced no prediction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_error: Option<String>,
}

impl Evaluation {
    /// Status recorded for this evaluation.
    #[must_use]
    pub fn status(&self) -> NutritionStatus {
        self.height_for_age.status
    }

    #[must_use]
    pub fn to_record(&self) -> HistoryRecord {
        HistoryRecord::new(self.measurement.clone(), self.status())
    }
}

/// Service running the evaluation pipeline against a ledger and an
/// optional predictive model.
///
/// Reference tables and the predictor are shared read-only, so one service
/// can be used from many threads at once.
pub struct GrowthService<S, P>
where
    S: HistoryStore,
    P: StatusPredictor,
{
    store: Arc<S>,
    height_reference: Arc<ReferenceTable>,
    weight_reference: Option<Arc<ReferenceTable>>,
    predictor: Option<Arc<P>>,
}

impl<S, P> GrowthService<S, P>
where
    S: HistoryStore,
    P: StatusPredictor,
    S::Error: Into<StorageError>,
{
    /// Create a service scoring height-for-age only.
    pub fn new(store: Arc<S>, height_reference: Arc<ReferenceTable>) -> Self {
        Self {
            store,
            height_reference,
            weight_reference: None,
            predictor: None,
        }
    }

    /// Also score weight-for-age and report the combined status.
    #[must_use]
    pub fn with_weight_reference(mut self, table: Arc<ReferenceTable>) -> Self {
        self.weight_reference = Some(table);
        self
    }

    /// Run the predictive classifier on every evaluation.
    #[must_use]
    pub fn with_predictor(mut self, predictor: Arc<P>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Score a measurement without recording it.
    ///
    /// # Errors
    /// - `Validation` for missing identity or out-of-range input
    /// - `Coverage` when the height table does not cover the age
    ///
    /// A predictor failure does not fail the assessment; it is reported in
    /// [`Evaluation::prediction_error`].
    pub fn assess(&self, measurement: &Measurement) -> Result<Evaluation> {
        validate(measurement)?;

        let age = f64::from(measurement.age_months);

        tracing::debug!("Step 1: Scoring height-for-age...");
        let height_for_age = GrowthAssessment::evaluate(
            GrowthMetric::HeightForAge,
            measurement.height_cm,
            age,
            measurement.sex,
            &self.height_reference,
        )
        .ok_or(NutrisenseError::Coverage {
            metric: GrowthMetric::HeightForAge,
            sex: measurement.sex,
            age_months: measurement.age_months,
        })?;

        let weight_for_age = self.weight_reference.as_ref().and_then(|table| {
            tracing::debug!("Step 2: Scoring weight-for-age...");
            let assessment = GrowthAssessment::evaluate(
                GrowthMetric::WeightForAge,
                measurement.weight_kg,
                age,
                measurement.sex,
                table,
            );
            if assessment.is_none() {
                tracing::debug!(
                    "Weight-for-age reference does not cover {} months",
                    measurement.age_months
                );
            }
            assessment
        });

        let combined_status =
            weight_for_age.map(|w| combined_status(w.z_score, height_for_age.z_score));

        let (prediction, prediction_error) = match &self.predictor {
            Some(predictor) => {
                tracing::debug!("Step 3: Running predictive classifier...");
                match predictor.predict(&measurement.features()) {
                    Ok(prediction) => (Some(prediction), None),
                    Err(e) => {
                        tracing::warn!("Predictive classifier failed: {}", e);
                        (None, Some(e.to_string()))
                    }
                }
            }
            None => (None, None),
        };

        Ok(Evaluation {
            measurement: measurement.clone(),
            status_text: height_for_age.status_text().to_string(),
            height_for_age,
            weight_for_age,
            combined_status,
            prediction,
            prediction_error,
        })
    }

    /// Score a measurement and append it to the child's history.
    ///
    /// # Errors
    /// Any error from [`GrowthService::assess`], in which case nothing is
    /// recorded, or `Persistence` carrying the computed evaluation when the
    /// ledger append fails.
    pub fn evaluate(&self, measurement: Measurement) -> Result<Evaluation> {
        tracing::info!("Starting growth evaluation...");

        let evaluation = self.assess(&measurement)?;

        tracing::debug!("Step 4: Appending to history...");
        if let Err(e) = self.store.append(&evaluation.to_record()) {
            let source: StorageError = e.into();
            tracing::warn!("Evaluation computed but not recorded: {}", source);
            return Err(NutrisenseError::Persistence {
                evaluation: Box::new(evaluation),
                source,
            });
        }

        tracing::info!(
            "Evaluation complete: age_month={}, z={:.3}, status={}, prediction={}",
            evaluation.measurement.age_months,
            evaluation.height_for_age.z_score,
            evaluation.status(),
            evaluation
                .prediction
                .map(|p| format!("{} ({:.2}%)", p.status, p.confidence * 100.0))
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(evaluation)
    }

    /// A child's records ordered by age.
    ///
    /// # Errors
    /// Returns `Storage` if the ledger cannot be read.
    pub fn history(&self, child_name: &str) -> Result<Vec<HistoryRecord>> {
        let records = self
            .store
            .fetch_sorted(child_name)
            .map_err(|e| NutrisenseError::Storage(e.into()))?;
        tracing::debug!("Fetched {} history records", records.len());
        Ok(records)
    }

    /// Renderer input for the height-for-age trend of `current`'s child.
    ///
    /// # Errors
    /// Returns `Validation` for an invalid current measurement, or `Storage`
    /// if the ledger cannot be read.
    pub fn trend(&self, current: &Measurement) -> Result<TrendChart> {
        validate(current)?;
        let history = self.history(&current.child_name)?;
        Ok(TrendChart::build(&self.height_reference, current, history))
    }
}

fn validate(measurement: &Measurement) -> Result<()> {
    measurement
        .validate()
        .map_err(|errors| NutrisenseError::Validation(errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryHistoryStore;
    use crate::domain::{Band, PredictorFeatures, ReferencePoint, Sex};
    use crate::ports::ModelError;
    use chrono::{TimeZone, Utc};

    struct FixedPredictor(NutritionStatus);

    impl StatusPredictor for FixedPredictor {
        fn predict(
            &self,
            features: &PredictorFeatures,
        ) -> std::result::Result<Prediction, ModelError> {
            assert!(features.age_years <= 5);
            Ok(Prediction {
                status: self.0,
                confidence: 0.9,
            })
        }
    }

    struct BrokenPredictor;

    impl StatusPredictor for BrokenPredictor {
        fn predict(&self, _: &PredictorFeatures) -> std::result::Result<Prediction, ModelError> {
            Err(ModelError::Inference("no trees".into()))
        }
    }

    struct UnavailableStore;

    impl HistoryStore for UnavailableStore {
        type Error = StorageError;

        fn append(&self, _: &HistoryRecord) -> std::result::Result<(), StorageError> {
            Err(StorageError::LockPoisoned)
        }

        fn fetch(&self, _: &str) -> std::result::Result<Vec<HistoryRecord>, StorageError> {
            Err(StorageError::LockPoisoned)
        }
    }

    fn height_table() -> Arc<ReferenceTable> {
        Arc::new(
            ReferenceTable::new(vec![
                ReferencePoint::new(12.0, Sex::Male, 75.0, 3.0),
                ReferencePoint::new(24.0, Sex::Male, 85.0, 3.5),
                ReferencePoint::new(12.0, Sex::Female, 74.0, 2.9),
                ReferencePoint::new(24.0, Sex::Female, 84.0, 3.4),
            ])
            .expect("Valid table"),
        )
    }

    fn weight_table() -> Arc<ReferenceTable> {
        Arc::new(
            ReferenceTable::new(vec![
                ReferencePoint::new(12.0, Sex::Male, 9.6, 1.0),
                ReferencePoint::new(24.0, Sex::Male, 12.2, 1.3),
            ])
            .expect("Valid table"),
        )
    }

    fn service() -> (
        Arc<InMemoryHistoryStore>,
        GrowthService<InMemoryHistoryStore, FixedPredictor>,
    ) {
        let store = Arc::new(InMemoryHistoryStore::new());
        let service = GrowthService::new(Arc::clone(&store), height_table());
        (store, service)
    }

    #[test]
    fn test_evaluate_records_history() {
        let (store, service) = service();

        let evaluation = service
            .evaluate(Measurement::new("Budi", 18, Sex::Male, 70.0, 9.0))
            .expect("Should evaluate");

        assert!((evaluation.height_for_age.reference.median - 80.0).abs() < 1e-9);
        assert!((evaluation.height_for_age.reference.sd - 3.25).abs() < 1e-9);
        assert!((evaluation.height_for_age.z_score - (-3.0769)).abs() < 1e-3);
        assert_eq!(evaluation.status(), NutritionStatus::Severe);
        assert_eq!(evaluation.status_text, NutritionStatus::Severe.description());
        assert!(evaluation.prediction.is_none());
        assert!(evaluation.prediction_error.is_none());
        assert!(evaluation.weight_for_age.is_none());

        let stored = store.fetch("budi").expect("Should fetch");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, NutritionStatus::Severe);
    }

    #[test]
    fn test_out_of_coverage_records_nothing() {
        let (store, service) = service();

        let result = service.evaluate(Measurement::new("Ana", 6, Sex::Female, 65.0, 7.0));
        assert!(matches!(
            result,
            Err(NutrisenseError::Coverage {
                metric: GrowthMetric::HeightForAge,
                sex: Sex::Female,
                age_months: 6,
            })
        ));
        assert!(store.fetch("ana").expect("Should fetch").is_empty());
    }

    #[test]
    fn test_invalid_input_rejected_before_persistence() {
        let (store, service) = service();

        let result = service.evaluate(Measurement::new("   ", 18, Sex::Male, 80.0, 10.0));
        assert!(matches!(result, Err(NutrisenseError::Validation(_))));

        let result = service.evaluate(Measurement::new("Budi", 18, Sex::Male, 80.0, 45.0));
        assert!(matches!(result, Err(NutrisenseError::Validation(_))));

        assert_eq!(store.children().expect("Should count"), 0);
    }

    #[test]
    fn test_weight_and_prediction_reported() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let service = GrowthService::new(Arc::clone(&store), height_table())
            .with_weight_reference(weight_table())
            .with_predictor(Arc::new(FixedPredictor(NutritionStatus::Risk)));

        let evaluation = service
            .evaluate(Measurement::new("Budi", 12, Sex::Male, 75.0, 7.4))
            .expect("Should evaluate");

        assert_eq!(evaluation.status(), NutritionStatus::Normal);
        let weight = evaluation.weight_for_age.expect("Weight covered");
        assert!((weight.z_score - (-2.2)).abs() < 1e-9);
        assert_eq!(weight.status, NutritionStatus::Risk);
        assert_eq!(evaluation.combined_status, Some(NutritionStatus::Risk));

        let prediction = evaluation.prediction.expect("Predictor configured");
        assert_eq!(prediction.status, NutritionStatus::Risk);

        // History records the height-for-age status only.
        let stored = store.fetch("budi").expect("Should fetch");
        assert_eq!(stored[0].status, NutritionStatus::Normal);
    }

    #[test]
    fn test_weight_outside_coverage_is_omitted() {
        let service: GrowthService<_, FixedPredictor> =
            GrowthService::new(Arc::new(InMemoryHistoryStore::new()), height_table())
                .with_weight_reference(weight_table());

        let evaluation = service
            .evaluate(Measurement::new("Sari", 18, Sex::Female, 80.0, 10.0))
            .expect("Should evaluate");
        assert!(evaluation.weight_for_age.is_none());
        assert!(evaluation.combined_status.is_none());
    }

    #[test]
    fn test_model_failure_keeps_growth_result() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let service = GrowthService::new(Arc::clone(&store), height_table())
            .with_predictor(Arc::new(BrokenPredictor));

        let evaluation = service
            .evaluate(Measurement::new("Budi", 18, Sex::Male, 70.0, 9.0))
            .expect("Should evaluate without a prediction");
        assert!((evaluation.height_for_age.z_score - (-3.0769)).abs() < 1e-3);
        assert_eq!(evaluation.status(), NutritionStatus::Severe);
        assert!(evaluation.prediction.is_none());
        let reason = evaluation.prediction_error.expect("Failure reported");
        assert!(reason.contains("no trees"));

        assert_eq!(store.fetch("budi").expect("Should fetch").len(), 1);
    }

    #[test]
    fn test_trend_rejects_invalid_measurement() {
        let (_, service) = service();

        let unnamed = Measurement::new("   ", 18, Sex::Male, 80.0, 10.0);
        assert!(matches!(
            service.trend(&unnamed),
            Err(NutrisenseError::Validation(_))
        ));

        let too_old = Measurement::new("Budi", 61, Sex::Male, 80.0, 10.0);
        assert!(matches!(
            service.trend(&too_old),
            Err(NutrisenseError::Validation(_))
        ));

        let not_a_height = Measurement::new("Budi", 18, Sex::Male, f64::NAN, 10.0);
        assert!(matches!(
            service.trend(&not_a_height),
            Err(NutrisenseError::Validation(_))
        ));
    }

    #[test]
    fn test_persistence_failure_carries_result() {
        let service: GrowthService<_, FixedPredictor> =
            GrowthService::new(Arc::new(UnavailableStore), height_table());

        match service.evaluate(Measurement::new("Budi", 18, Sex::Male, 70.0, 9.0)) {
            Err(NutrisenseError::Persistence { evaluation, source }) => {
                assert_eq!(evaluation.status(), NutritionStatus::Severe);
                assert!(matches!(source, StorageError::LockPoisoned));
            }
            other => panic!("Expected persistence failure, got {other:?}"),
        }

        assert!(matches!(
            service.history("budi"),
            Err(NutrisenseError::Storage(StorageError::LockPoisoned))
        ));
    }

    #[test]
    fn test_history_sorted_and_name_insensitive() {
        let (_, service) = service();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("ts");
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().expect("ts");

        service
            .evaluate(Measurement::new("Budi", 14, Sex::Male, 78.0, 9.8).at(t1))
            .expect("Should evaluate");
        service
            .evaluate(Measurement::new(" BUDI", 12, Sex::Male, 75.0, 9.5).at(t0))
            .expect("Should evaluate");

        let ages: Vec<u32> = service
            .history("budi ")
            .expect("Should fetch")
            .iter()
            .map(|r| r.measurement.age_months)
            .collect();
        assert_eq!(ages, vec![12, 14]);
    }

    #[test]
    fn test_trend_includes_history_and_current() {
        let (_, service) = service();
        service
            .evaluate(Measurement::new("Budi", 20, Sex::Male, 81.0, 10.5))
            .expect("Should evaluate");
        service
            .evaluate(Measurement::new("Budi", 16, Sex::Male, 78.0, 10.0))
            .expect("Should evaluate");

        let current = Measurement::new("Budi", 22, Sex::Male, 83.0, 11.0);
        let chart = service.trend(&current).expect("Should build");

        assert_eq!(chart.sex, Sex::Male);
        assert_eq!(chart.reference.len(), 2);
        let ages: Vec<u32> = chart.history.iter().map(|p| p.age_month).collect();
        assert_eq!(ages, vec![16, 20]);
        assert_eq!(chart.current.age_month, 22);

        let minus2 = chart.curve(Band::Minus2Sd).expect("Band present");
        assert!((minus2.points[0].1 - 69.0).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_evaluations_all_recorded() {
        let (store, service) = service();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    for j in 0..5 {
                        service
                            .evaluate(Measurement::new(
                                "Budi",
                                12 + i + j,
                                Sex::Male,
                                78.0,
                                10.0,
                            ))
                            .expect("Should evaluate");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(store.fetch("budi").expect("Should fetch").len(), 40);
    }
}
