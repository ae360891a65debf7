//! Fitting the scaler and classifier against the bundled dataset.
//!
//! Runs at most once per deployment, when the artifact pair is absent
//! from the model directory.

use ndarray::{Array1, Array2, Axis};

use crate::ports::ClassifierError;

use super::{ModelArtifact, ScalerArtifact};

/// Labeled training data: one row per subject, one label per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

/// The labeled dataset bundled with the binary.
const TRAINING_CSV: &str = include_str!("../../../data/heart.csv");

const EPOCHS: usize = 2000;
const LEARNING_RATE: f64 = 0.1;

/// Parse the bundled CSV into a dataset.
///
/// # Errors
/// Returns `Artifact` if the CSV is malformed.
pub fn embedded_dataset() -> Result<Dataset, ClassifierError> {
    parse_csv(TRAINING_CSV)
}

fn parse_csv(csv: &str) -> Result<Dataset, ClassifierError> {
    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut columns = 0usize;

    for (index, line) in csv.lines().skip(1).enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values: Vec<f64> = line
            .split(',')
            .map(|cell| {
                cell.trim().parse::<f64>().map_err(|e| {
                    ClassifierError::Artifact(format!(
                        "Training data row {}: {e}",
                        index + 2
                    ))
                })
            })
            .collect::<Result<_, _>>()?;

        let Some((&label, row)) = values.split_last() else {
            return Err(ClassifierError::Artifact(format!(
                "Training data row {} is empty",
                index + 2
            )));
        };
        if columns == 0 {
            columns = row.len();
        } else if row.len() != columns {
            return Err(ClassifierError::Artifact(format!(
                "Training data row {} has {} columns, expected {columns}",
                index + 2,
                row.len()
            )));
        }

        features.extend_from_slice(row);
        labels.push(label);
    }

    if labels.is_empty() {
        return Err(ClassifierError::Artifact(
            "Training data is empty".to_string(),
        ));
    }

    let rows = labels.len();
    let features = Array2::from_shape_vec((rows, columns), features)
        .map_err(|e| ClassifierError::Artifact(format!("Training data shape: {e}")))?;

    Ok(Dataset {
        features,
        labels: Array1::from_vec(labels),
    })
}

/// Fit a standard scaler (per-column mean and standard deviation).
///
/// Zero-variance columns get a unit deviation so scaling stays total.
#[must_use]
pub fn fit_scaler(features: &Array2<f64>) -> ScalerArtifact {
    let rows = features.nrows() as f64;
    let mean = features.sum_axis(Axis(0)) / rows;
    let variance = features
        .map_axis(Axis(0), |column| {
            let m = column.sum() / rows;
            column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / rows
        });
    let std = variance.mapv(|v| {
        let s = v.sqrt();
        if s == 0.0 {
            1.0
        } else {
            s
        }
    });

    ScalerArtifact {
        mean: mean.to_vec(),
        std: std.to_vec(),
    }
}

/// Apply a fitted scaler to a feature matrix.
#[must_use]
pub fn apply_scaler(features: &Array2<f64>, scaler: &ScalerArtifact) -> Array2<f64> {
    let mean = Array1::from_vec(scaler.mean.clone());
    let std = Array1::from_vec(scaler.std.clone());
    (features - &mean) / &std
}

/// Fit a logistic-regression classifier by full-batch gradient descent.
///
/// Deterministic: zero-initialized weights, fixed epoch count and
/// learning rate, no shuffling.
#[must_use]
pub fn fit_logistic(scaled: &Array2<f64>, labels: &Array1<f64>) -> ModelArtifact {
    let rows = scaled.nrows() as f64;
    let mut weights = Array1::<f64>::zeros(scaled.ncols());
    let mut bias = 0.0f64;

    for _ in 0..EPOCHS {
        let logits = scaled.dot(&weights) + bias;
        let predictions = logits.mapv(sigmoid);
        let residual = &predictions - labels;

        let grad_weights = scaled.t().dot(&residual) / rows;
        let grad_bias = residual.sum() / rows;

        weights = weights - grad_weights * LEARNING_RATE;
        bias -= LEARNING_RATE * grad_bias;
    }

    ModelArtifact {
        weights: weights.to_vec(),
        bias,
    }
}

pub(super) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
