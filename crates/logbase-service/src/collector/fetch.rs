use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use regex::{Captures, Regex};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::models::{FeedSource, FeedType};

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("could not parse feed: {0}")]
    Parse(#[from] parser::ParseFeedError),
}

/// Matches whole CDATA sections and every `&` outside them, capturing the
/// rest of the `&` when it already starts a predefined or numeric entity.
static AMPERSAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?P<cdata><!\[CDATA\[.*?\]\]>)|&(?P<entity>amp;|lt;|gt;|quot;|apos;|#[0-9]+;|#x[0-9a-fA-F]+;)?",
    )
    .expect("ampersand pattern is valid")
});

/// Escapes bare `&` characters that many blog platforms leave in their XML.
/// CDATA sections are left untouched.
pub fn sanitize_xml(xml: &str) -> Cow<'_, str> {
    AMPERSAND_RE.replace_all(xml, |caps: &Captures| {
        if caps.name("cdata").is_some() || caps.name("entity").is_some() {
            caps[0].to_string()
        } else {
            "&amp;".to_string()
        }
    })
}

/// A feed entry tagged with the feed it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedEntry {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub blog_name: String,
    pub feed_type: FeedType,
    pub matched_keywords: Vec<String>,
}

impl CollectedEntry {
    fn from_entry(entry: Entry, feed: &FeedSource) -> Self {
        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default();
        let guid = if entry.id.trim().is_empty() {
            link.clone()
        } else {
            entry.id.trim().to_string()
        };

        CollectedEntry {
            guid,
            title: entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default(),
            link,
            published: entry.published.or(entry.updated),
            summary: entry.summary.map(|s| s.content),
            content: entry.content.and_then(|c| c.body),
            author: entry.authors.first().map(|a| a.name.clone()),
            blog_name: feed.name.clone(),
            feed_type: feed.feed_type,
            matched_keywords: Vec::new(),
        }
    }

    /// Title, content and summary joined for keyword matching.
    pub fn searchable_text(&self) -> String {
        [
            Some(self.title.as_str()),
            self.content.as_deref(),
            self.summary.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Parses a (sanitized) feed document into entries for `feed`.
pub fn parse_feed(body: &str, feed: &FeedSource) -> Result<Vec<CollectedEntry>, FeedError> {
    let xml = sanitize_xml(body);
    let parsed = parser::parse(xml.as_bytes())?;

    Ok(parsed
        .entries
        .into_iter()
        .map(|entry| CollectedEntry::from_entry(entry, feed))
        .filter(|entry| !entry.title.is_empty())
        .collect())
}

#[derive(Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, feed: &FeedSource) -> Result<Vec<CollectedEntry>, FeedError> {
        let response = self
            .client
            .get(&feed.url)
            .timeout(FEED_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        let body = response.text().await?;
        let entries = parse_feed(&body, feed)?;
        debug!(feed = %feed.name, entries = entries.len(), "Parsed feed");
        Ok(entries)
    }
}
