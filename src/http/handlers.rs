//! Request handlers.
//!
//! Handlers stay thin: authorize where required, validate the payload
//! shape, call the service, and wrap the result in the wire envelope.
//! Success envelopes always carry `"success": true`; failures are
//! produced by `ApiError`.
//!
//! Body and query extractors are taken as `Result` so their rejections
//! flow through the same error envelope instead of axum's plain-text
//! defaults, and so the bearer check runs before any body validation.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::PredictOutcome;
use crate::domain::{
    LoginRequest, Pagination, PredictionInput, PredictionResponse, SignupRequest, User,
    UserResponse,
};
use crate::http::SharedState;
use crate::ports::{Classifier, PredictionFilter, Store};
use crate::ApiError;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

impl TokenResponse {
    fn new(token: String, user: &User) -> Self {
        Self {
            success: true,
            token,
            user: UserResponse::from(user),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub outcome: PredictOutcome,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct PredictionListResponse {
    pub success: bool,
    pub predictions: Vec<PredictionResponse>,
}

#[derive(Debug, Serialize)]
pub struct PagedPredictionsResponse {
    pub success: bool,
    pub predictions: Vec<PredictionResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub risk_level: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub prediction_ids: Vec<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "Server is running" }))
}

pub async fn signup<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let payload = json_body(payload)?;
    require_fields(&payload, &["email", "password", "name"])?;
    let request: SignupRequest =
        serde_json::from_value(payload).map_err(|e| ApiError::Validation(e.to_string()))?;

    let (token, user) = state.auth.signup(request).await?;
    Ok(Json(TokenResponse::new(token, &user)))
}

pub async fn login<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let payload = json_body(payload)?;
    let has_credentials = ["email", "password"].iter().all(|field| {
        payload
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty())
    });
    if !has_credentials {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let request: LoginRequest =
        serde_json::from_value(payload).map_err(|e| ApiError::Validation(e.to_string()))?;
    let (token, user) = state.auth.login(request).await?;
    Ok(Json(TokenResponse::new(token, &user)))
}

pub async fn predict<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let user = state.auth.authorize(&headers).await?;

    let payload = json_body(payload)?;
    if payload.is_null() {
        return Err(ApiError::Validation("No data received".to_string()));
    }
    let input = PredictionInput::parse(payload).map_err(ApiError::Validation)?;

    let outcome = state.predictions.predict(&user, input).await?;
    Ok(Json(PredictResponse {
        outcome,
        success: true,
    }))
}

pub async fn user_predictions<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
) -> Result<Json<PredictionListResponse>, ApiError> {
    let user = state.auth.authorize(&headers).await?;
    let predictions = state.predictions.history(&user).await?;
    Ok(Json(PredictionListResponse {
        success: true,
        predictions,
    }))
}

pub async fn filtered_predictions<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PagedPredictionsResponse>, ApiError> {
    let user = state.auth.authorize(&headers).await?;
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;

    let filter = PredictionFilter {
        risk_level: query.risk_level,
        start: query.start_date.as_deref().map(parse_date).transpose()?,
        end: query.end_date.as_deref().map(parse_date).transpose()?,
    };
    let (predictions, pagination) = state
        .predictions
        .list(&user, &filter, query.page, query.per_page)
        .await?;

    Ok(Json(PagedPredictionsResponse {
        success: true,
        predictions,
        pagination,
    }))
}

pub async fn get_prediction<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = state.auth.authorize(&headers).await?;
    let prediction = state.predictions.get(&user, &id).await?;
    Ok(Json(json!({ "success": true, "prediction": prediction })))
}

pub async fn update_prediction<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = state.auth.authorize(&headers).await?;

    let Value::Object(changes) = json_body(payload)? else {
        return Err(ApiError::Validation("No data received".to_string()));
    };
    let prediction = state.predictions.update(&user, &id, changes).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prediction updated successfully",
        "prediction": prediction,
    })))
}

pub async fn delete_prediction<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = state.auth.authorize(&headers).await?;
    state.predictions.delete(&user, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Prediction deleted successfully",
    })))
}

pub async fn bulk_delete_predictions<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
    request: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = state.auth.authorize(&headers).await?;
    let Json(request) = request.map_err(|e| ApiError::Validation(e.body_text()))?;

    let deleted = state
        .predictions
        .bulk_delete(&user, &request.prediction_ids)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully deleted {deleted} predictions"),
    })))
}

pub async fn admin_predictions<S: Store, C: Classifier>(
    State(state): State<SharedState<S, C>>,
    headers: HeaderMap,
) -> Result<Json<PredictionListResponse>, ApiError> {
    let user = state.auth.authorize(&headers).await?;
    let predictions = state.predictions.list_all(&user).await?;
    Ok(Json(PredictionListResponse {
        success: true,
        predictions,
    }))
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(value) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(value)
}

fn require_fields(payload: &Value, fields: &[&str]) -> Result<(), ApiError> {
    for field in fields {
        if payload.get(field).is_none() {
            return Err(ApiError::Validation(format!(
                "Missing required field: {field}"
            )));
        }
    }
    Ok(())
}

/// Accepts RFC 3339, a bare datetime, or a bare date (midnight UTC).
fn parse_date(value: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(at.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(at) = day.and_hms_opt(0, 0, 0) {
            return Ok(at.and_utc());
        }
    }
    Err(ApiError::Validation(format!("Invalid date format: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("2024-06-01").is_ok());
        assert!(parse_date("2024-06-01T12:30:00").is_ok());
        assert!(parse_date("2024-06-01T12:30:00Z").is_ok());
        assert!(parse_date("2024-06-01T12:30:00+02:00").is_ok());
        assert!(parse_date("June first").is_err());
    }

    #[test]
    fn test_bare_date_is_midnight_utc() {
        let at = parse_date("2024-06-01").expect("Should parse");
        assert_eq!(at.to_rfc3339(), "2024-06-01T00:00:00+00:00");
    }

    #[test]
    fn test_require_fields_reports_first_missing() {
        let payload = json!({ "email": "a@x.com" });
        let result = require_fields(&payload, &["email", "password", "name"]);
        let Err(ApiError::Validation(message)) = result else {
            panic!("Expected validation error");
        };
        assert_eq!(message, "Missing required field: password");
    }

    #[test]
    fn test_bulk_delete_request_defaults_to_empty() {
        let request: BulkDeleteRequest = serde_json::from_value(json!({})).expect("Should parse");
        assert!(request.prediction_ids.is_empty());
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListQuery = serde_json::from_value(json!({})).expect("Should parse");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 10);
        assert!(query.risk_level.is_none());
    }
}
