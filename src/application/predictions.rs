//! Prediction pipeline: the core request orchestration.
//!
//! Per request: validate input, encode features, infer, persist, respond.
//! Every stage short-circuits to an error response; there is no rollback
//! of earlier side effects. Persistence is two single-document writes
//! (insert the record, push the owner's reference); a crash between them
//! is an accepted inconsistency window.
//!
//! Also hosts retrieval, filtered/paginated listing, partial update,
//! single and bulk deletion, and the admin-only system-wide listing. All
//! of these are scoped to the requesting user except the admin listing.

use std::sync::Arc;

use mongodb::bson::{self, oid::ObjectId};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{
    Pagination, PredictionInput, PredictionRecord, PredictionResponse, RiskLevel, User,
};
use crate::ports::{Classifier, PredictionFilter, Store};
use crate::ApiError;

/// Fields a partial update may never overwrite.
const IMMUTABLE_FIELDS: [&str; 4] = ["_id", "id", "user_id", "timestamp"];

/// Response payload of a successful prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictOutcome {
    pub prediction: i32,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub user_name: String,
    pub user_email: String,
}

/// Orchestrates inference and prediction CRUD against the store.
pub struct PredictionService<S, C> {
    store: Arc<S>,
    classifier: Arc<C>,
}

impl<S: Store, C: Classifier> PredictionService<S, C> {
    pub fn new(store: Arc<S>, classifier: Arc<C>) -> Self {
        Self { store, classifier }
    }

    /// Run the full pipeline: encode, infer, persist, respond.
    ///
    /// # Errors
    /// `Dependency` on classifier or store failure.
    pub async fn predict(
        &self,
        user: &User,
        input: PredictionInput,
    ) -> Result<PredictOutcome, ApiError> {
        let features = input.feature_vector();
        tracing::debug!("Encoded feature vector: {features:?}");

        let inference = self.classifier.infer(&features)?;
        let record = PredictionRecord::new(
            user,
            input.snapshot(),
            inference.label,
            inference.probability,
        );

        // Two writes, no transaction. Inference is pure, so a failure here
        // loses nothing that cannot be recomputed from the same input.
        self.store.insert_prediction(&record).await?;
        self.store.push_prediction_ref(user.id, record.id).await?;

        tracing::info!(
            "Prediction stored for {}: label={}, probability={:.3}, risk={}",
            user.email,
            inference.label,
            inference.probability,
            record.risk_level
        );

        Ok(PredictOutcome {
            prediction: inference.label,
            probability: inference.probability,
            risk_level: record.risk_level,
            user_name: user.name.clone(),
            user_email: user.email.clone(),
        })
    }

    /// The caller's full prediction history, newest first.
    pub async fn history(&self, user: &User) -> Result<Vec<PredictionResponse>, ApiError> {
        let records = self.store.user_predictions(user.id).await?;
        Ok(records.into_iter().map(PredictionResponse::from).collect())
    }

    /// Filtered, offset-paginated listing of the caller's predictions.
    ///
    /// `page` and `per_page` are clamped to at least 1.
    pub async fn list(
        &self,
        user: &User,
        filter: &PredictionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<PredictionResponse>, Pagination), ApiError> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let result = self
            .store
            .filter_predictions(user.id, filter, page, per_page)
            .await?;

        let pagination = Pagination::new(page, per_page, result.total);
        let items = result
            .items
            .into_iter()
            .map(PredictionResponse::from)
            .collect();
        Ok((items, pagination))
    }

    /// Fetch one prediction owned by the caller.
    ///
    /// # Errors
    /// `NotFound` for an unknown id or one owned by someone else.
    pub async fn get(&self, user: &User, id: &str) -> Result<PredictionResponse, ApiError> {
        let oid = parse_prediction_id(id)?;
        let record = self
            .store
            .find_prediction(oid, user.id)
            .await?
            .ok_or(ApiError::NotFound("Prediction"))?;
        Ok(record.into())
    }

    /// Partially update one owned prediction. Identifier, owner, and
    /// timestamp are immutable and silently stripped from the change set.
    ///
    /// # Errors
    /// `NotFound` if unknown/unowned; `Validation` if nothing changes.
    pub async fn update(
        &self,
        user: &User,
        id: &str,
        mut changes: Map<String, Value>,
    ) -> Result<PredictionResponse, ApiError> {
        let oid = parse_prediction_id(id)?;
        let record = self
            .store
            .find_prediction(oid, user.id)
            .await?
            .ok_or(ApiError::NotFound("Prediction"))?;

        for field in IMMUTABLE_FIELDS {
            changes.remove(field);
        }
        let changes = bson::to_document(&Value::Object(changes))
            .map_err(|e| ApiError::Validation(format!("Invalid update payload: {e}")))?;

        if changes.is_empty() {
            return Err(ApiError::Validation(
                "No changes made to prediction".to_string(),
            ));
        }

        // A $set is applied unconditionally, so a value the record schema
        // cannot hold would corrupt the stored document and break every
        // later read of it. Verify the merged document still deserializes
        // before writing anything.
        let mut merged =
            bson::to_document(&record).map_err(|e| ApiError::Dependency(e.to_string()))?;
        for (key, value) in changes.clone() {
            merged.insert(key, value);
        }
        bson::from_document::<PredictionRecord>(merged)
            .map_err(|e| ApiError::Validation(format!("Invalid update payload: {e}")))?;

        let modified = self.store.update_prediction(oid, user.id, changes).await?;
        if modified == 0 {
            return Err(ApiError::Validation(
                "No changes made to prediction".to_string(),
            ));
        }

        let updated = self
            .store
            .find_prediction(oid, user.id)
            .await?
            .ok_or(ApiError::NotFound("Prediction"))?;
        Ok(updated.into())
    }

    /// Delete one owned prediction and drop its owner reference.
    ///
    /// # Errors
    /// `NotFound` for an unknown or unowned id.
    pub async fn delete(&self, user: &User, id: &str) -> Result<(), ApiError> {
        let oid = parse_prediction_id(id)?;
        self.store
            .find_prediction(oid, user.id)
            .await?
            .ok_or(ApiError::NotFound("Prediction"))?;

        if !self.store.delete_prediction(oid, user.id).await? {
            return Err(ApiError::Dependency(
                "Failed to delete prediction".to_string(),
            ));
        }
        self.store.pull_prediction_refs(user.id, &[oid]).await?;

        tracing::info!("Deleted prediction {id} for {}", user.email);
        Ok(())
    }

    /// Delete many owned predictions by id, silently skipping unowned
    /// ids. Returns the number actually deleted.
    ///
    /// # Errors
    /// `Validation` for an empty id list or a malformed id.
    pub async fn bulk_delete(&self, user: &User, ids: &[String]) -> Result<u64, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::Validation(
                "No prediction IDs provided".to_string(),
            ));
        }

        let oids: Vec<ObjectId> = ids
            .iter()
            .map(|id| parse_prediction_id(id))
            .collect::<Result<_, _>>()?;

        let deleted = self.store.delete_predictions(&oids, user.id).await?;
        self.store.pull_prediction_refs(user.id, &oids).await?;

        tracing::info!("Bulk deleted {deleted} predictions for {}", user.email);
        Ok(deleted)
    }

    /// Every prediction in the system. Admins only.
    ///
    /// # Errors
    /// `Forbidden` when the caller lacks the admin flag.
    pub async fn list_all(&self, user: &User) -> Result<Vec<PredictionResponse>, ApiError> {
        if !user.is_admin {
            return Err(ApiError::Forbidden);
        }

        let records = self.store.all_predictions().await?;
        Ok(records.into_iter().map(PredictionResponse::from).collect())
    }
}

fn parse_prediction_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id)
        .map_err(|_| ApiError::Validation("Invalid prediction ID format".to_string()))
}
