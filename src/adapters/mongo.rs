//! MongoDB adapter: Implementation of the Store port.
//!
//! Document-per-record persistence over the official `mongodb` driver.
//! Indexes are ensured at connect time: a unique index on user email,
//! a compound owner/timestamp index, and a risk-level index for filtered
//! listings. The insert-then-push write pair for new predictions is not
//! transactional; single-document atomicity is the only guarantee.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use crate::domain::{PredictionRecord, User};
use crate::ports::{PredictionFilter, PredictionPage, Store, StoreError};

/// MongoDB-backed store.
pub struct MongoStore {
    users: Collection<User>,
    predictions: Collection<PredictionRecord>,
}

impl MongoStore {
    /// Connect to the database and ensure indexes.
    ///
    /// # Errors
    /// Returns `Backend` if the connection or index creation fails.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await.map_err(backend)?;
        let db = client.database(database);

        let store = Self {
            users: db.collection("users"),
            predictions: db.collection("predictions"),
        };
        store.ensure_indexes().await?;

        tracing::info!("Connected to MongoDB database {database}");
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(unique_email).await.map_err(backend)?;

        let owner_recency = IndexModel::builder()
            .keys(doc! { "user_id": 1, "timestamp": -1 })
            .build();
        self.predictions
            .create_index(owner_recency)
            .await
            .map_err(backend)?;

        let risk = IndexModel::builder().keys(doc! { "risk_level": 1 }).build();
        self.predictions.create_index(risk).await.map_err(backend)?;

        Ok(())
    }

    fn filter_query(user_id: ObjectId, filter: &PredictionFilter) -> Document {
        let mut query = doc! { "user_id": user_id };

        if let Some(risk_level) = &filter.risk_level {
            query.insert("risk_level", risk_level);
        }

        let mut range = Document::new();
        if let Some(start) = filter.start {
            range.insert("$gte", DateTime::from_chrono(start));
        }
        if let Some(end) = filter.end {
            range.insert("$lte", DateTime::from_chrono(end));
        }
        if !range.is_empty() {
            query.insert("timestamp", range);
        }

        query
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert_one(user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::DuplicateEmail
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users
            .find_one(doc! { "email": email })
            .await
            .map_err(backend)
    }

    async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        self.users
            .find_one(doc! { "_id": id })
            .await
            .map_err(backend)
    }

    async fn insert_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.predictions.insert_one(record).await.map_err(backend)?;
        Ok(())
    }

    async fn push_prediction_ref(
        &self,
        user_id: ObjectId,
        prediction_id: ObjectId,
    ) -> Result<(), StoreError> {
        self.users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$push": { "predictions": prediction_id } },
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn pull_prediction_refs(
        &self,
        user_id: ObjectId,
        prediction_ids: &[ObjectId],
    ) -> Result<(), StoreError> {
        self.users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$pull": { "predictions": { "$in": prediction_ids } } },
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn user_predictions(&self, user_id: ObjectId) -> Result<Vec<PredictionRecord>, StoreError> {
        self.predictions
            .find(doc! { "user_id": user_id })
            .sort(doc! { "timestamp": -1 })
            .await
            .map_err(backend)?
            .try_collect()
            .await
            .map_err(backend)
    }

    async fn all_predictions(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        self.predictions
            .find(doc! {})
            .sort(doc! { "timestamp": -1 })
            .await
            .map_err(backend)?
            .try_collect()
            .await
            .map_err(backend)
    }

    async fn filter_predictions(
        &self,
        user_id: ObjectId,
        filter: &PredictionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<PredictionPage, StoreError> {
        let query = Self::filter_query(user_id, filter);

        let total = self
            .predictions
            .count_documents(query.clone())
            .await
            .map_err(backend)?;

        let items = self
            .predictions
            .find(query)
            .sort(doc! { "timestamp": -1 })
            .skip(page.saturating_sub(1).saturating_mul(per_page))
            .limit(i64::try_from(per_page).unwrap_or(i64::MAX))
            .await
            .map_err(backend)?
            .try_collect()
            .await
            .map_err(backend)?;

        Ok(PredictionPage { items, total })
    }

    async fn find_prediction(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<Option<PredictionRecord>, StoreError> {
        self.predictions
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await
            .map_err(backend)
    }

    async fn update_prediction(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        changes: Document,
    ) -> Result<u64, StoreError> {
        let result = self
            .predictions
            .update_one(
                doc! { "_id": id, "user_id": user_id },
                doc! { "$set": changes },
            )
            .await
            .map_err(backend)?;
        Ok(result.modified_count)
    }

    async fn delete_prediction(&self, id: ObjectId, user_id: ObjectId) -> Result<bool, StoreError> {
        let result = self
            .predictions
            .delete_one(doc! { "_id": id, "user_id": user_id })
            .await
            .map_err(backend)?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_predictions(
        &self,
        ids: &[ObjectId],
        user_id: ObjectId,
    ) -> Result<u64, StoreError> {
        let result = self
            .predictions
            .delete_many(doc! { "_id": { "$in": ids }, "user_id": user_id })
            .await
            .map_err(backend)?;
        Ok(result.deleted_count)
    }
}

fn backend(error: mongodb::error::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// Duplicate-key write error (E11000), raised by the unique email index.
fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}
