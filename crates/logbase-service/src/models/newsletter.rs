use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Who a newsletter went out to, as synced at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientSnapshot {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// One entry of the `newsletters/newsletters.json` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterRecord {
    pub filename: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    pub sent_date: NaiveDate,
    pub html_file_path: String,
    #[serde(default)]
    pub recipients: Vec<RecipientSnapshot>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}
