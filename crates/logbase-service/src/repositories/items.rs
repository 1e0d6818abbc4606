use super::traits::{ItemRepository, ListItemsParams, ListItemsResult};
use super::{SharedConnection, lock};
use crate::errors::ApiError;
use crate::models::{NewRssItem, RssItem, RssItemChanges};
use crate::schema::rss_items;
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

#[derive(Clone)]
pub struct SqliteItemRepository {
    db: SharedConnection,
}

impl SqliteItemRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn insert_if_absent(&self, item: &NewRssItem) -> Result<bool, ApiError> {
        let mut conn = lock(&self.db)?;
        // Skips rows violating the guid key or the (title, blog_name) index.
        let inserted = diesel::insert_or_ignore_into(rss_items::table)
            .values(item)
            .execute(&mut *conn)?;
        Ok(inserted > 0)
    }

    async fn find_by_guid(&self, guid: &str) -> Result<Option<RssItem>, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = rss_items::table
            .find(guid)
            .select(RssItem::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn list(&self, params: &ListItemsParams) -> Result<ListItemsResult, ApiError> {
        let mut conn = lock(&self.db)?;

        let mut count_query = rss_items::table.count().into_boxed();
        let mut items_query = rss_items::table.select(RssItem::as_select()).into_boxed();
        if let Some(feed_type) = params.feed_type {
            count_query = count_query.filter(rss_items::feed_type.eq(feed_type));
            items_query = items_query.filter(rss_items::feed_type.eq(feed_type));
        }

        let total: i64 = count_query.get_result(&mut *conn)?;

        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let items = items_query
            .order((rss_items::pub_date.desc(), rss_items::created_at.desc()))
            .limit(i64::from(limit))
            .offset(i64::from(params.offset.unwrap_or(0)))
            .load(&mut *conn)?;

        Ok(ListItemsResult {
            items,
            total: total as u64,
        })
    }

    async fn update(
        &self,
        guid: &str,
        changes: &RssItemChanges,
    ) -> Result<Option<RssItem>, ApiError> {
        let mut conn = lock(&self.db)?;
        let updated = diesel::update(rss_items::table.find(guid))
            .set(changes)
            .execute(&mut *conn)?;
        if updated == 0 {
            return Ok(None);
        }

        let item = rss_items::table
            .find(guid)
            .select(RssItem::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(item)
    }

    async fn delete(&self, guid: &str) -> Result<Option<RssItem>, ApiError> {
        let mut conn = lock(&self.db)?;
        let existing = rss_items::table
            .find(guid)
            .select(RssItem::as_select())
            .first(&mut *conn)
            .optional()?;
        if existing.is_some() {
            diesel::delete(rss_items::table.find(guid)).execute(&mut *conn)?;
        }
        Ok(existing)
    }

    async fn find_by_newsletter_date(&self, date: NaiveDate) -> Result<Vec<RssItem>, ApiError> {
        let mut conn = lock(&self.db)?;
        let items = rss_items::table
            .filter(rss_items::news_letter_sent_date.eq(date))
            .order((rss_items::pub_date.desc(), rss_items::title.asc()))
            .select(RssItem::as_select())
            .load(&mut *conn)?;
        Ok(items)
    }

    async fn titles_collected_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(String, String)>, ApiError> {
        let mut conn = lock(&self.db)?;
        let keys = rss_items::table
            .filter(rss_items::collected_date.eq(date))
            .select((rss_items::title, rss_items::blog_name))
            .load(&mut *conn)?;
        Ok(keys)
    }
}
