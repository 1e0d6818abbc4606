use crate::errors::ApiError;
use crate::models::{FeedType, NewRssItem, NewSubscriber, RssItem, RssItemChanges, Subscriber};
use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct ListItemsParams {
    pub feed_type: Option<FeedType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ListItemsResult {
    pub items: Vec<RssItem>,
    pub total: u64,
}

#[async_trait]
pub trait ItemRepository: Clone + Send + Sync + 'static {
    /// Inserts the item unless its guid, or its title within the same blog,
    /// is already stored. Returns whether a row was written.
    async fn insert_if_absent(&self, item: &NewRssItem) -> Result<bool, ApiError>;
    async fn find_by_guid(&self, guid: &str) -> Result<Option<RssItem>, ApiError>;
    async fn list(&self, params: &ListItemsParams) -> Result<ListItemsResult, ApiError>;
    async fn update(
        &self,
        guid: &str,
        changes: &RssItemChanges,
    ) -> Result<Option<RssItem>, ApiError>;
    async fn delete(&self, guid: &str) -> Result<Option<RssItem>, ApiError>;
    async fn find_by_newsletter_date(&self, date: NaiveDate) -> Result<Vec<RssItem>, ApiError>;
    /// `(title, blog_name)` of every item in a collection day bucket.
    async fn titles_collected_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(String, String)>, ApiError>;
}

#[async_trait]
pub trait SubscriberRepository: Clone + Send + Sync + 'static {
    async fn upsert_by_email(&self, subscriber: &NewSubscriber) -> Result<Subscriber, ApiError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, ApiError>;
    async fn list_active(&self) -> Result<Vec<Subscriber>, ApiError>;
}
