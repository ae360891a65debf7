//! # Cardioserve
//!
//! Heart disease risk prediction service: JWT-authenticated HTTP API over
//! MongoDB, with an embedded logistic regression classifier.
//!
//! This crate provides:
//! - User signup and login with Argon2 password hashing
//! - Per-user heart disease risk predictions with full CRUD history
//! - Filtered, paginated listings and an admin-only system view
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (User, PredictionRecord, feature encoding)
//! - `ports`: Trait definitions for external operations (Store, Classifier)
//! - `adapters`: Concrete implementations (MongoDB, model artifacts)
//! - `application`: Use cases orchestrating domain and ports
//! - `http`: Axum delivery layer

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod ports;

pub use application::AuthFailure;
pub use config::Config;
pub use domain::RiskLevel;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ports::{ClassifierError, StoreError};

/// Result type for Cardioserve operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Main error type, mapped onto HTTP responses by the delivery layer.
///
/// The body shape is always `{"success": false, "error": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or unacceptable client input. 400.
    #[error("{0}")]
    Validation(String),

    /// Authentication failure. 401.
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    /// Authenticated but not allowed. 403.
    #[error("Unauthorized access")]
    Forbidden,

    /// The named resource does not exist for this caller. 404.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request conflicts with existing state. 400.
    #[error("{0}")]
    Conflict(String),

    /// A backing dependency failed. 400.
    #[error("{0}")]
    Dependency(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::Dependency(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!("Request failed: {message}");
        } else {
            tracing::debug!("Request rejected ({status}): {message}");
        }
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateEmail => {
                ApiError::Conflict("Email already registered".to_string())
            }
            StoreError::Backend(message) => ApiError::Dependency(message),
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(error: ClassifierError) -> Self {
        ApiError::Dependency(error.to_string())
    }
}
