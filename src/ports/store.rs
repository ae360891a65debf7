//! Store port: Trait for document persistence.
//!
//! Abstracts the document database from the application services. Every
//! prediction operation is scoped by owner id; the sole unscoped read is
//! the admin listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Document};

use crate::domain::{PredictionRecord, User};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Backend(String),
}

/// Filters for the paginated prediction listing.
///
/// `risk_level` is an exact string match; the timestamp range is inclusive
/// on both ends. An unrecognized risk level simply matches nothing.
#[derive(Debug, Clone, Default)]
pub struct PredictionFilter {
    pub risk_level: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// One page of predictions plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct PredictionPage {
    pub items: Vec<PredictionRecord>,
    pub total: u64,
}

/// Trait for document store operations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new user. Fails with `DuplicateEmail` if the email exists.
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    /// Look up a user by exact email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Look up a user by id.
    async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError>;

    /// Persist a prediction record.
    async fn insert_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Append a prediction id to the owner's reference list.
    ///
    /// Not atomic with `insert_prediction`; a crash between the two writes
    /// leaves the prediction persisted but unreferenced.
    async fn push_prediction_ref(
        &self,
        user_id: ObjectId,
        prediction_id: ObjectId,
    ) -> Result<(), StoreError>;

    /// Remove prediction ids from the owner's reference list.
    async fn pull_prediction_refs(
        &self,
        user_id: ObjectId,
        prediction_ids: &[ObjectId],
    ) -> Result<(), StoreError>;

    /// All predictions owned by a user, newest first.
    async fn user_predictions(&self, user_id: ObjectId) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Every prediction in the system (admin listing).
    async fn all_predictions(&self) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Filtered, offset-paginated listing scoped to one owner,
    /// newest first. `skip = (page - 1) * per_page`.
    async fn filter_predictions(
        &self,
        user_id: ObjectId,
        filter: &PredictionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<PredictionPage, StoreError>;

    /// Fetch one prediction, filtered by owner.
    async fn find_prediction(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<Option<PredictionRecord>, StoreError>;

    /// Apply a `$set`-style partial update, filtered by owner.
    /// Returns the number of documents modified.
    async fn update_prediction(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        changes: Document,
    ) -> Result<u64, StoreError>;

    /// Delete one prediction, filtered by owner. Returns whether a
    /// document was removed.
    async fn delete_prediction(&self, id: ObjectId, user_id: ObjectId) -> Result<bool, StoreError>;

    /// Delete every prediction in `ids` owned by `user_id`, silently
    /// skipping unowned ids. Returns the deleted count.
    async fn delete_predictions(
        &self,
        ids: &[ObjectId],
        user_id: ObjectId,
    ) -> Result<u64, StoreError>;
}
