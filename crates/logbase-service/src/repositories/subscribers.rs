use super::traits::SubscriberRepository;
use super::{SharedConnection, lock};
use crate::errors::ApiError;
use crate::models::{NewSubscriber, Subscriber, SubscriberStatus};
use crate::schema::newsletter_subscribers;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqliteSubscriberRepository {
    db: SharedConnection,
}

impl SqliteSubscriberRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriberRepository for SqliteSubscriberRepository {
    async fn upsert_by_email(&self, subscriber: &NewSubscriber) -> Result<Subscriber, ApiError> {
        let mut conn = lock(&self.db)?;
        let changes = subscriber.changes(Utc::now().naive_utc());

        diesel::insert_into(newsletter_subscribers::table)
            .values(subscriber)
            .on_conflict(newsletter_subscribers::email)
            .do_update()
            .set(&changes)
            .execute(&mut *conn)?;

        let stored = newsletter_subscribers::table
            .find(&subscriber.email)
            .select(Subscriber::as_select())
            .first(&mut *conn)?;
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = newsletter_subscribers::table
            .find(email)
            .select(Subscriber::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn list_active(&self) -> Result<Vec<Subscriber>, ApiError> {
        let mut conn = lock(&self.db)?;
        let subscribers = newsletter_subscribers::table
            .filter(newsletter_subscribers::status.eq(SubscriberStatus::Active))
            .order(newsletter_subscribers::created_at.asc())
            .select(Subscriber::as_select())
            .load(&mut *conn)?;
        Ok(subscribers)
    }
}
