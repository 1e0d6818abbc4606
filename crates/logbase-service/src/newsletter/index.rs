use tracing::debug;

use crate::errors::ApiError;
use crate::models::NewsletterRecord;
use crate::storage::{self, NEWSLETTER_INDEX_PATH, ObjectStore};

/// The JSON array cataloguing generated newsletters.
///
/// Every change downloads, modifies and uploads the whole file; concurrent
/// writers can overwrite each other.
#[derive(Clone)]
pub struct NewsletterIndex<S> {
    store: S,
}

impl<S: ObjectStore> NewsletterIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Vec<NewsletterRecord>, ApiError> {
        Ok(
            storage::get_json::<Vec<NewsletterRecord>, _>(&self.store, NEWSLETTER_INDEX_PATH)
                .await?
                .unwrap_or_default(),
        )
    }

    async fn save(&self, records: &[NewsletterRecord]) -> Result<(), ApiError> {
        storage::put_json(&self.store, NEWSLETTER_INDEX_PATH, records).await?;
        debug!(records = records.len(), "Saved newsletter index");
        Ok(())
    }

    pub async fn find(&self, filename: &str) -> Result<NewsletterRecord, ApiError> {
        self.load()
            .await?
            .into_iter()
            .find(|record| record.filename == filename)
            .ok_or_else(|| ApiError::NotFound(format!("Newsletter {filename}")))
    }

    pub async fn append(&self, record: NewsletterRecord) -> Result<(), ApiError> {
        let mut records = self.load().await?;
        if records.iter().any(|r| r.filename == record.filename) {
            return Err(ApiError::Conflict(format!(
                "Newsletter {} already exists",
                record.filename
            )));
        }
        records.push(record);
        self.save(&records).await
    }

    /// Applies `change` to the record named `filename` and returns it.
    pub async fn update<F>(&self, filename: &str, change: F) -> Result<NewsletterRecord, ApiError>
    where
        F: FnOnce(&mut NewsletterRecord),
    {
        let mut records = self.load().await?;
        let record = records
            .iter_mut()
            .find(|record| record.filename == filename)
            .ok_or_else(|| ApiError::NotFound(format!("Newsletter {filename}")))?;
        change(record);
        let updated = record.clone();
        self.save(&records).await?;
        Ok(updated)
    }
}
