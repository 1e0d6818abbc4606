use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::fetch::CollectedEntry;
use crate::models::FeedType;

/// Configured keywords found in `text`, case-insensitively, in configured
/// order and without duplicates.
pub fn match_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();
    for keyword in keywords {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() || matched.iter().any(|m| m.to_lowercase() == needle) {
            continue;
        }
        if haystack.contains(&needle) {
            matched.push(keyword.trim().to_string());
        }
    }
    matched
}

/// Annotates entries with their matched keywords. Noncompetitor entries
/// that match nothing are dropped; everything else is kept.
pub fn apply_keyword_policy(
    entries: Vec<CollectedEntry>,
    keywords: &[String],
) -> Vec<CollectedEntry> {
    entries
        .into_iter()
        .filter_map(|mut entry| {
            entry.matched_keywords = match_keywords(&entry.searchable_text(), keywords);
            match entry.feed_type {
                FeedType::Noncompetitor if entry.matched_keywords.is_empty() => None,
                _ => Some(entry),
            }
        })
        .collect()
}

/// One calendar day in the collection timezone, as a half-open UTC range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CollectionWindow {
    pub fn for_day(day: NaiveDate, tz: Tz) -> Self {
        let next = day.succ_opt().unwrap_or(day);
        Self {
            day,
            start: local_midnight(day, tz),
            end: local_midnight(next, tz),
        }
    }

    /// The day before `now`'s local date.
    pub fn yesterday(now: DateTime<Utc>, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        Self::for_day(today - Duration::days(1), tz)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn local_midnight(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// The local calendar date of `now` in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}
