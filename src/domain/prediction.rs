//! Prediction records and risk classification.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::features::InputSnapshot;
use super::user::User;

/// Risk classification derived from the binary prediction label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Label 0: no disease indicated.
    Low,
    /// Label 1: disease indicated, follow-up advised.
    High,
}

impl RiskLevel {
    /// Derive the risk level from the classifier's binary label.
    #[must_use]
    pub fn from_label(label: i32) -> Self {
        if label == 1 {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::High => write!(f, "High"),
        }
    }
}

/// A persisted prediction document.
///
/// Owner name and email are denormalized snapshots taken at creation time
/// and are not kept in sync with later user edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub user_name: String,
    pub user_email: String,
    pub input_data: InputSnapshot,
    pub prediction: i32,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub timestamp: DateTime,
}

impl PredictionRecord {
    /// Create a new record owned by `user`, timestamped now.
    #[must_use]
    pub fn new(user: &User, input_data: InputSnapshot, prediction: i32, probability: f64) -> Self {
        Self {
            id: ObjectId::new(),
            user_id: user.id,
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            input_data,
            prediction,
            probability,
            risk_level: RiskLevel::from_label(prediction),
            timestamp: DateTime::now(),
        }
    }
}

/// JSON-facing view of a prediction (string ids, RFC 3339 timestamp).
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub input_data: InputSnapshot,
    pub prediction: i32,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub timestamp: String,
}

impl From<PredictionRecord> for PredictionResponse {
    fn from(record: PredictionRecord) -> Self {
        Self {
            id: record.id.to_hex(),
            user_id: record.user_id.to_hex(),
            user_name: record.user_name,
            user_email: record.user_email,
            input_data: record.input_data,
            prediction: record.prediction,
            probability: record.probability,
            risk_level: record.risk_level,
            timestamp: record.timestamp.to_chrono().to_rfc3339(),
        }
    }
}

/// Offset-pagination metadata returned with filtered listings.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    /// Compute pagination metadata; `total_pages = ceil(total / per_page)`.
    #[must_use]
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_label() {
        assert_eq!(RiskLevel::from_label(1), RiskLevel::High);
        assert_eq!(RiskLevel::from_label(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_label(7), RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::High).unwrap(),
            "\"High\""
        );
        assert_eq!(RiskLevel::Low.to_string(), "Low");
    }

    #[test]
    fn test_pagination_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
        assert_eq!(Pagination::new(2, 7, 20).total_pages, 3);
    }

    #[test]
    fn test_record_derives_risk_from_label() {
        let user = User::new("a@x.com", "hash", "A");
        let input = crate::domain::PredictionInput::parse(serde_json::json!({
            "age": 50, "gender": 0, "chestPain": "typical", "restingBP": 120,
            "cholesterol": 200, "fastingBS": 0, "restingECG": "normal",
            "maxHR": 150, "smoking": 0, "obesity": 0
        }))
        .unwrap();

        let record = PredictionRecord::new(&user, input.snapshot(), 1, 0.83);
        assert_eq!(record.risk_level, RiskLevel::High);
        assert_eq!(record.user_email, "a@x.com");

        let response = PredictionResponse::from(record.clone());
        assert_eq!(response.id, record.id.to_hex());
        assert!(response.timestamp.contains('T'));
    }
}
