use chrono::{NaiveDate, NaiveDateTime};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};

use super::FeedType;

/// Keywords matched against an item, stored as a JSON array in a text column.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(transparent)]
pub struct Keywords(pub Vec<String>);

impl From<Vec<String>> for Keywords {
    fn from(keywords: Vec<String>) -> Self {
        Keywords(keywords)
    }
}

impl FromSql<Text, Sqlite> for Keywords {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(Keywords(serde_json::from_str(&raw)?))
    }
}

impl ToSql<Text, Sqlite> for Keywords {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(serde_json::to_string(&self.0)?);
        Ok(IsNull::No)
    }
}

/// A collected feed entry or an authored blog post.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::rss_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct RssItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub pub_date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub blog_name: String,
    pub feed_type: FeedType,
    pub matched_keywords: Keywords,
    pub collected_date: NaiveDate,
    #[serde(rename = "news_letter_sent_date")]
    pub news_letter_sent_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::rss_items)]
pub struct NewRssItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub pub_date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub blog_name: String,
    pub feed_type: FeedType,
    pub matched_keywords: Keywords,
    pub collected_date: NaiveDate,
    pub news_letter_sent_date: Option<NaiveDate>,
}

/// Fields merged into an existing item. `None` leaves a column untouched;
/// `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::rss_items)]
pub struct RssItemChanges {
    pub title: Option<String>,
    pub pub_date: Option<Option<NaiveDateTime>>,
    pub description: Option<Option<String>>,
    pub content: Option<Option<String>>,
    pub author: Option<Option<String>>,
    pub news_letter_sent_date: Option<Option<NaiveDate>>,
    pub updated_at: Option<NaiveDateTime>,
}

impl RssItemChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.pub_date.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.author.is_none()
            && self.news_letter_sent_date.is_none()
    }
}
