//! Model adapter: artifact-backed scaler + logistic classifier.
//!
//! The engine has two bootstrap states: Untrained and Ready. At process
//! start, `load_or_train` either loads the persisted artifact pair
//! (`scaler.json`, `heart_model.json`) or fits both against the bundled
//! labeled dataset and persists them. Once constructed the model is
//! immutable; `infer` is a pure call safe for concurrent use, and the
//! engine never re-trains during normal operation.

mod train;

use std::fs;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::domain::FEATURE_COUNT;
use crate::ports::{Classifier, ClassifierError, Inference};

pub use train::{apply_scaler, embedded_dataset, fit_logistic, fit_scaler, Dataset};

const SCALER_FILE: &str = "scaler.json";
const MODEL_FILE: &str = "heart_model.json";

/// Persisted scaling transform: per-feature mean and standard deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Persisted classifier: logistic-regression weights and intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// The loaded, immutable inference engine.
pub struct ArtifactModel {
    mean: Array1<f64>,
    std: Array1<f64>,
    weights: Array1<f64>,
    bias: f64,
}

impl ArtifactModel {
    /// Load the artifact pair from `dir`, training and persisting it
    /// first if either file is absent.
    ///
    /// # Errors
    /// Returns `Artifact` if training data, artifact files, or the
    /// model directory cannot be handled.
    pub fn load_or_train(dir: &Path) -> Result<Self, ClassifierError> {
        let scaler_path = dir.join(SCALER_FILE);
        let model_path = dir.join(MODEL_FILE);

        if !scaler_path.exists() || !model_path.exists() {
            tracing::info!("Model artifacts absent, training new model...");
            let (scaler, model) = Self::train()?;
            persist(dir, &scaler_path, &scaler)?;
            persist(dir, &model_path, &model)?;
            tracing::info!("Model trained and saved to {}", dir.display());
            return Self::assemble(scaler, model);
        }

        tracing::info!("Loading model artifacts from {}", dir.display());
        let scaler: ScalerArtifact = read_artifact(&scaler_path)?;
        let model: ModelArtifact = read_artifact(&model_path)?;
        Self::assemble(scaler, model)
    }

    /// Fit the scaler and classifier against the bundled dataset.
    fn train() -> Result<(ScalerArtifact, ModelArtifact), ClassifierError> {
        let dataset = embedded_dataset()?;
        let scaler = fit_scaler(&dataset.features);
        let scaled = apply_scaler(&dataset.features, &scaler);
        let model = fit_logistic(&scaled, &dataset.labels);
        Ok((scaler, model))
    }

    fn assemble(scaler: ScalerArtifact, model: ModelArtifact) -> Result<Self, ClassifierError> {
        for (name, len) in [
            ("scaler mean", scaler.mean.len()),
            ("scaler std", scaler.std.len()),
            ("model weights", model.weights.len()),
        ] {
            if len != FEATURE_COUNT {
                return Err(ClassifierError::Artifact(format!(
                    "{name} has {len} entries, expected {FEATURE_COUNT}"
                )));
            }
        }
        if scaler.std.iter().any(|&s| s == 0.0) {
            return Err(ClassifierError::Artifact(
                "scaler std contains zero entries".to_string(),
            ));
        }

        Ok(Self {
            mean: Array1::from_vec(scaler.mean),
            std: Array1::from_vec(scaler.std),
            weights: Array1::from_vec(model.weights),
            bias: model.bias,
        })
    }
}

impl Classifier for ArtifactModel {
    fn infer(&self, features: &[f64]) -> Result<Inference, ClassifierError> {
        if features.len() != FEATURE_COUNT {
            return Err(ClassifierError::Dimension(features.len()));
        }

        let raw = Array1::from_vec(features.to_vec());
        let scaled = (raw - &self.mean) / &self.std;
        let probability = train::sigmoid(scaled.dot(&self.weights) + self.bias);
        let label = i32::from(probability >= 0.5);

        Ok(Inference { label, probability })
    }
}

fn persist<T: Serialize>(dir: &Path, path: &Path, artifact: &T) -> Result<(), ClassifierError> {
    fs::create_dir_all(dir)
        .map_err(|e| ClassifierError::Artifact(format!("Creating {}: {e}", dir.display())))?;
    let json = serde_json::to_string_pretty(artifact)
        .map_err(|e| ClassifierError::Artifact(format!("Serializing artifact: {e}")))?;
    fs::write(path, json)
        .map_err(|e| ClassifierError::Artifact(format!("Writing {}: {e}", path.display())))
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ClassifierError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ClassifierError::Artifact(format!("Reading {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| ClassifierError::Artifact(format!("Parsing {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high_risk_vector() -> [f64; FEATURE_COUNT] {
        // Older smoker: asymptomatic chest pain, high BP and cholesterol.
        [67.0, 1.0, 3.0, 160.0, 286.0, 1.0, 2.0, 108.0, 1.0, 1.0]
    }

    fn low_risk_vector() -> [f64; FEATURE_COUNT] {
        [37.0, 0.0, 1.0, 118.0, 190.0, 0.0, 0.0, 185.0, 0.0, 0.0]
    }

    #[test]
    fn test_trains_when_artifacts_absent() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let model = ArtifactModel::load_or_train(dir.path()).expect("Should train");

        assert!(dir.path().join(SCALER_FILE).exists());
        assert!(dir.path().join(MODEL_FILE).exists());

        let inference = model.infer(&high_risk_vector()).expect("Should infer");
        assert!((0.0..=1.0).contains(&inference.probability));
    }

    #[test]
    fn test_loads_identical_artifacts_on_second_boot() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let trained = ArtifactModel::load_or_train(dir.path()).expect("Should train");
        let loaded = ArtifactModel::load_or_train(dir.path()).expect("Should load");

        let features = high_risk_vector();
        let first = trained.infer(&features).expect("Should infer");
        let second = loaded.infer(&features).expect("Should infer");
        assert!((first.probability - second.probability).abs() < 1e-12);
        assert_eq!(first.label, second.label);
    }

    #[test]
    fn test_label_matches_probability_threshold() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let model = ArtifactModel::load_or_train(dir.path()).expect("Should train");

        for features in [high_risk_vector(), low_risk_vector()] {
            let inference = model.infer(&features).expect("Should infer");
            assert_eq!(inference.label, i32::from(inference.probability >= 0.5));
        }
    }

    #[test]
    fn test_separates_obvious_cases() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let model = ArtifactModel::load_or_train(dir.path()).expect("Should train");

        let high = model.infer(&high_risk_vector()).expect("Should infer");
        let low = model.infer(&low_risk_vector()).expect("Should infer");
        assert!(high.probability > low.probability);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let model = ArtifactModel::load_or_train(dir.path()).expect("Should train");

        let result = model.infer(&[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(ClassifierError::Dimension(3))));
    }

    #[test]
    fn test_corrupt_artifact_rejected() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        std::fs::write(dir.path().join(SCALER_FILE), "{not json").unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), "{}").unwrap();

        assert!(ArtifactModel::load_or_train(dir.path()).is_err());
    }
}
