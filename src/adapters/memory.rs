//! In-memory Store implementation for service tests.
//!
//! Mirrors the MongoDB adapter's semantics closely enough to exercise the
//! application services: owner scoping, newest-first ordering, offset
//! pagination, and `$set`-style partial updates.

use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId, Document};

use crate::domain::{PredictionRecord, User};
use crate::ports::{PredictionFilter, PredictionPage, Store, StoreError};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    predictions: Vec<PredictionRecord>,
}

/// Volatile store for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(record: &PredictionRecord, user_id: ObjectId, filter: &PredictionFilter) -> bool {
        if record.user_id != user_id {
            return false;
        }
        if let Some(risk_level) = &filter.risk_level {
            if record.risk_level.to_string() != *risk_level {
                return false;
            }
        }
        let at = record.timestamp.to_chrono();
        if let Some(start) = filter.start {
            if at < start {
                return false;
            }
        }
        if let Some(end) = filter.end {
            if at > end {
                return false;
            }
        }
        true
    }
}

fn newest_first(records: &mut [PredictionRecord]) {
    records.sort_by_key(|r| std::cmp::Reverse(r.timestamp.timestamp_millis()));
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().expect("Lock failed");
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().expect("Lock failed");
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        inner.predictions.push(record.clone());
        Ok(())
    }

    async fn push_prediction_ref(
        &self,
        user_id: ObjectId,
        prediction_id: ObjectId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) {
            user.predictions.push(prediction_id);
        }
        Ok(())
    }

    async fn pull_prediction_refs(
        &self,
        user_id: ObjectId,
        prediction_ids: &[ObjectId],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) {
            user.predictions.retain(|id| !prediction_ids.contains(id));
        }
        Ok(())
    }

    async fn user_predictions(&self, user_id: ObjectId) -> Result<Vec<PredictionRecord>, StoreError> {
        let inner = self.inner.lock().expect("Lock failed");
        let mut records: Vec<_> = inner
            .predictions
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn all_predictions(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let inner = self.inner.lock().expect("Lock failed");
        let mut records = inner.predictions.clone();
        newest_first(&mut records);
        Ok(records)
    }

    async fn filter_predictions(
        &self,
        user_id: ObjectId,
        filter: &PredictionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<PredictionPage, StoreError> {
        let inner = self.inner.lock().expect("Lock failed");
        let mut records: Vec<_> = inner
            .predictions
            .iter()
            .filter(|r| Self::matches(r, user_id, filter))
            .cloned()
            .collect();
        newest_first(&mut records);

        let total = records.len() as u64;
        let skip = usize::try_from(page.saturating_sub(1).saturating_mul(per_page))
            .unwrap_or(usize::MAX);
        let items = records
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        Ok(PredictionPage { items, total })
    }

    async fn find_prediction(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<Option<PredictionRecord>, StoreError> {
        let inner = self.inner.lock().expect("Lock failed");
        Ok(inner
            .predictions
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn update_prediction(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        changes: Document,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        let Some(record) = inner
            .predictions
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id)
        else {
            return Ok(0);
        };

        let mut document = bson::to_document(record)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let before = document.clone();
        for (key, value) in changes {
            document.insert(key, value);
        }
        if document == before {
            return Ok(0);
        }

        *record = bson::from_document(document)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(1)
    }

    async fn delete_prediction(&self, id: ObjectId, user_id: ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        let before = inner.predictions.len();
        inner
            .predictions
            .retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(inner.predictions.len() < before)
    }

    async fn delete_predictions(
        &self,
        ids: &[ObjectId],
        user_id: ObjectId,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().expect("Lock failed");
        let before = inner.predictions.len();
        inner
            .predictions
            .retain(|r| !(ids.contains(&r.id) && r.user_id == user_id));
        Ok((before - inner.predictions.len()) as u64)
    }
}
