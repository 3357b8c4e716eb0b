//! Predictor port: Trait for the trained status classifier.
//!
//! The model is trained offline. The engine only sees a pure function from
//! the feature vector to a status and confidence.

use crate::domain::{Prediction, PredictorFeatures};

/// Errors from loading or running the predictive model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(String),

    #[error("Failed to read model artifact: {0}")]
    Read(String),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Trait for status prediction from raw features.
///
/// Implementations hold no mutable state, so one instance can serve any
/// number of concurrent evaluations.
pub trait StatusPredictor: Send + Sync {
    /// Predict a status label and its confidence.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if the features cannot be scored.
    fn predict(&self, features: &PredictorFeatures) -> Result<Prediction, ModelError>;
}
