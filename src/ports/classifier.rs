//! Classifier port: Trait for the inference capability.
//!
//! The classifier is an opaque, pre-fit scaler + model pair. Inference is
//! pure and side-effect-free, so implementations are shared freely across
//! request handlers without locking.

use crate::domain::FEATURE_COUNT;

/// Errors from the inference capability.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("Expected {FEATURE_COUNT} features, got {0}")]
    Dimension(usize),
}

/// Result of a single inference call.
#[derive(Debug, Clone, Copy)]
pub struct Inference {
    /// Binary label: 1 = disease indicated, 0 = not.
    pub label: i32,
    /// Positive-class probability in [0, 1].
    pub probability: f64,
}

/// Trait for binary classification over the fixed feature vector.
pub trait Classifier: Send + Sync {
    /// Scale the raw feature vector and classify it.
    ///
    /// # Errors
    /// Returns `Dimension` if the vector length is wrong, `Artifact` on
    /// internal model failure.
    fn infer(&self, features: &[f64]) -> Result<Inference, ClassifierError>;
}
