//! Domain layer: Core business types and logic.
//!
//! Pure types for users, predictions, feature encoding, and password
//! hashing. No HTTP or database concerns live here.

mod features;
pub mod password;
mod prediction;
mod user;

pub use features::{
    encode_chest_pain, encode_resting_ecg, InputSnapshot, PredictionInput, FEATURE_COUNT,
    REQUIRED_FIELDS,
};
pub use prediction::{Pagination, PredictionRecord, PredictionResponse, RiskLevel};
pub use user::{LoginRequest, SignupRequest, User, UserResponse};
