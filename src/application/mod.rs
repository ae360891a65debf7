//! Application layer: Service orchestration over the ports.
//!
//! Services are generic over the store and classifier ports and carry no
//! HTTP concerns; the delivery layer translates their results into
//! responses.

pub mod auth;
pub mod predictions;

pub use auth::{AuthFailure, AuthService, Claims};
pub use predictions::{PredictOutcome, PredictionService};
