//! Daily RSS collection: fetch every active feed, keep entries that pass the
//! keyword policy and were published in the collection window, and store the
//! ones not seen before.

mod fetch;
mod filter;
mod schedule;

pub use fetch::{CollectedEntry, FeedError, FeedFetcher, parse_feed, sanitize_xml};
pub use filter::{CollectionWindow, apply_keyword_policy, local_date, match_keywords};
pub use schedule::{next_run_after, spawn_daily_collection};

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::errors::ApiError;
use crate::keywords::load_keywords;
use crate::models::{FeedSource, Keywords, NewRssItem};
use crate::repositories::ItemRepository;
use crate::storage::{self, FEEDS_PATH, ObjectStore};
use crate::{AppState, config::CollectConfig};

/// Saved items between two pauses.
const SAVE_BATCH: usize = 5;

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedOutcome {
    pub name: String,
    pub fetched: usize,
    pub kept: usize,
    pub saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub window_day: Option<NaiveDate>,
    pub total_fetched: usize,
    /// Entries that passed the keyword and date filters.
    pub total_filtered: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed_feeds: usize,
    pub duration_ms: u128,
    pub feeds: Vec<FeedOutcome>,
}

/// Composite of title and blog name an item is deduplicated on.
pub fn dedup_key(title: &str, blog_name: &str) -> String {
    format!("{}\u{1f}{}", title.trim(), blog_name.trim())
}

/// Feeds configured in storage; a missing file means no feeds.
pub async fn load_feeds<S: ObjectStore>(store: &S) -> Result<Vec<FeedSource>, ApiError> {
    Ok(storage::get_json::<Vec<FeedSource>, _>(store, FEEDS_PATH)
        .await?
        .unwrap_or_default())
}

pub struct RssCollector<I, S> {
    items: I,
    store: S,
    fetcher: FeedFetcher,
    timezone: Tz,
    delay: Duration,
}

impl<I: ItemRepository, S: ObjectStore> RssCollector<I, S> {
    pub fn new(items: I, store: S, fetcher: FeedFetcher, settings: &CollectConfig) -> Self {
        Self {
            items,
            store,
            fetcher,
            timezone: settings.timezone,
            delay: settings.delay,
        }
    }

    /// Collects entries published yesterday relative to `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<CollectionReport, ApiError> {
        let window = CollectionWindow::yesterday(now, self.timezone);
        self.run_window(window, now).await
    }

    /// Collects entries published on an explicit local day.
    #[instrument(skip_all, fields(day = %window.day))]
    pub async fn run_window(
        &self,
        window: CollectionWindow,
        now: DateTime<Utc>,
    ) -> Result<CollectionReport, ApiError> {
        let started = Instant::now();
        let bucket = local_date(now, self.timezone);

        let feeds: Vec<FeedSource> = load_feeds(&self.store)
            .await?
            .into_iter()
            .filter(FeedSource::is_active)
            .collect();
        let keywords = load_keywords(&self.store).await?;
        info!(feeds = feeds.len(), keywords = keywords.len(), "Starting RSS collection");

        let mut seen: HashSet<String> = self
            .items
            .titles_collected_on(bucket)
            .await?
            .into_iter()
            .map(|(title, blog_name)| dedup_key(&title, &blog_name))
            .collect();

        let mut report = CollectionReport {
            window_day: Some(window.day),
            ..Default::default()
        };

        for (index, feed) in feeds.iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }

            let entries = match self.fetcher.fetch(feed).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(feed = %feed.name, url = %feed.url, error = %err, "Failed to fetch feed");
                    report.failed_feeds += 1;
                    report.feeds.push(FeedOutcome {
                        name: feed.name.clone(),
                        error: Some(err.to_string()),
                        ..Default::default()
                    });
                    continue;
                }
            };

            let fetched = entries.len();
            let kept: Vec<CollectedEntry> = apply_keyword_policy(entries, &keywords)
                .into_iter()
                .filter(|entry| entry.published.is_some_and(|at| window.contains(at)))
                .collect();

            let mut outcome = FeedOutcome {
                name: feed.name.clone(),
                fetched,
                kept: kept.len(),
                ..Default::default()
            };
            report.total_fetched += fetched;
            report.total_filtered += kept.len();

            for entry in kept {
                if !seen.insert(dedup_key(&entry.title, &entry.blog_name)) {
                    debug!(title = %entry.title, blog = %entry.blog_name, "Skipping duplicate entry");
                    report.skipped += 1;
                    continue;
                }

                match self.items.insert_if_absent(&new_item(entry, bucket)).await {
                    Ok(true) => {
                        outcome.saved += 1;
                        report.saved += 1;
                        if report.saved % SAVE_BATCH == 0 {
                            self.pause().await;
                        }
                    }
                    Ok(false) => report.skipped += 1,
                    Err(err) => {
                        warn!(feed = %feed.name, error = %err, "Failed to save entry");
                        outcome.error = Some(err.to_string());
                        report.skipped += 1;
                    }
                }
            }

            info!(
                feed = %feed.name,
                fetched = outcome.fetched,
                kept = outcome.kept,
                saved = outcome.saved,
                "Processed feed"
            );
            report.feeds.push(outcome);
        }

        report.duration_ms = started.elapsed().as_millis();
        info!(
            total_fetched = report.total_fetched,
            total_filtered = report.total_filtered,
            saved = report.saved,
            skipped = report.skipped,
            failed_feeds = report.failed_feeds,
            duration_ms = report.duration_ms as u64,
            "RSS collection finished"
        );
        Ok(report)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

fn new_item(entry: CollectedEntry, bucket: NaiveDate) -> NewRssItem {
    NewRssItem {
        guid: entry.guid,
        title: entry.title,
        link: entry.link,
        pub_date: entry.published.map(|at| at.naive_utc()),
        description: entry.summary,
        content: entry.content,
        author: entry.author,
        blog_name: entry.blog_name,
        feed_type: entry.feed_type,
        matched_keywords: Keywords(entry.matched_keywords),
        collected_date: bucket,
        news_letter_sent_date: None,
    }
}

/// A collector wired to the application's repositories and storage.
pub fn collector_for<S: AppState>(state: &S) -> RssCollector<S::Items, S::Store> {
    RssCollector::new(
        state.items(),
        state.store(),
        state.fetcher().clone(),
        &state.config().collect,
    )
}
