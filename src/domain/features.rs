//! Clinical input features and categorical encoding.
//!
//! The classifier consumes a fixed-order 10-dimensional vector. Two of the
//! raw request fields are categorical strings and are mapped to small
//! integer codes through fixed lookup tables before scaling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of features the classifier expects.
pub const FEATURE_COUNT: usize = 10;

/// Request field names, in the order the classifier expects them.
pub const REQUIRED_FIELDS: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "chestPain",
    "restingBP",
    "cholesterol",
    "fastingBS",
    "restingECG",
    "maxHR",
    "smoking",
    "obesity",
];

/// Raw prediction request payload.
///
/// Numeric flags (`gender`, `fastingBS`, `smoking`, `obesity`) use the
/// 0/1 convention of the training dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionInput {
    pub age: f64,
    pub gender: f64,
    #[serde(rename = "chestPain")]
    pub chest_pain: String,
    #[serde(rename = "restingBP")]
    pub resting_bp: f64,
    pub cholesterol: f64,
    #[serde(rename = "fastingBS")]
    pub fasting_bs: f64,
    #[serde(rename = "restingECG")]
    pub resting_ecg: String,
    #[serde(rename = "maxHR")]
    pub max_hr: f64,
    pub smoking: f64,
    pub obesity: f64,
}

/// Denormalized input snapshot stored with each prediction.
///
/// Keeps every raw field plus human-readable renderings of the
/// categorical/boolean ones, frozen at prediction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub age: f64,
    pub gender: String,
    #[serde(rename = "chestPain")]
    pub chest_pain: String,
    #[serde(rename = "restingBP")]
    pub resting_bp: f64,
    pub cholesterol: f64,
    #[serde(rename = "fastingBS")]
    pub fasting_bs: String,
    #[serde(rename = "restingECG")]
    pub resting_ecg: String,
    #[serde(rename = "maxHR")]
    pub max_hr: f64,
    pub smoking: String,
    pub obesity: String,
}

impl PredictionInput {
    /// Parse a prediction payload, reporting the first missing field by name.
    ///
    /// Presence is the primary gate; values are then coerced to their
    /// expected primitive types (no range checks).
    ///
    /// # Errors
    /// Returns a human-readable message for a missing or uncoercible field.
    pub fn parse(value: Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "No data received".to_string())?;

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(format!("Missing required field: {field}"));
            }
        }

        serde_json::from_value(Value::Object(object.clone()))
            .map_err(|e| format!("Invalid field value: {e}"))
    }

    /// Build the fixed-order feature vector for inference.
    #[must_use]
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.gender,
            encode_chest_pain(&self.chest_pain),
            self.resting_bp,
            self.cholesterol,
            self.fasting_bs,
            encode_resting_ecg(&self.resting_ecg),
            self.max_hr,
            self.smoking,
            self.obesity,
        ]
    }

    /// Freeze this input into the stored snapshot form.
    #[must_use]
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            age: self.age,
            gender: flag_to_gender(self.gender),
            chest_pain: self.chest_pain.clone(),
            resting_bp: self.resting_bp,
            cholesterol: self.cholesterol,
            fasting_bs: flag_to_yes_no(self.fasting_bs),
            resting_ecg: self.resting_ecg.clone(),
            max_hr: self.max_hr,
            smoking: flag_to_yes_no(self.smoking),
            obesity: flag_to_yes_no(self.obesity),
        }
    }
}

/// Map a chest-pain category to its integer code.
///
/// Unrecognized categories default to 0 (typical), matching the training
/// data encoding. The default is logged since it can mask bad input.
#[must_use]
pub fn encode_chest_pain(category: &str) -> f64 {
    match category {
        "typical" => 0.0,
        "atypical" => 1.0,
        "nonanginal" => 2.0,
        "asymptomatic" => 3.0,
        other => {
            tracing::debug!("Unknown chest pain category {other:?}, encoding as 0");
            0.0
        }
    }
}

/// Map a resting-ECG category to its integer code.
///
/// Unrecognized categories default to 0 (normal).
#[must_use]
pub fn encode_resting_ecg(category: &str) -> f64 {
    match category {
        "normal" => 0.0,
        "st-t" => 1.0,
        "lv" => 2.0,
        other => {
            tracing::debug!("Unknown resting ECG category {other:?}, encoding as 0");
            0.0
        }
    }
}

fn flag_to_gender(flag: f64) -> String {
    if flag == 1.0 { "male" } else { "female" }.to_string()
}

fn flag_to_yes_no(flag: f64) -> String {
    if flag == 1.0 { "yes" } else { "no" }.to_string()
}
