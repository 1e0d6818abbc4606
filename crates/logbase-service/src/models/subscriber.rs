use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::deserialize::FromSqlRow;
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use super::{UnknownVariant, text_column};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    #[default]
    Active,
    Inactive,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriberStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriberStatus::Active),
            "inactive" => Ok(SubscriberStatus::Inactive),
            other => Err(UnknownVariant {
                kind: "subscriber status",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(SubscriberStatus);

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::newsletter_subscribers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub status: SubscriberStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A signup, keyed by email. Re-submitting the same email updates the
/// existing subscriber in place.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::newsletter_subscribers)]
pub struct NewSubscriber {
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub status: SubscriberStatus,
}

impl NewSubscriber {
    pub fn changes(&self, now: NaiveDateTime) -> SubscriberChanges {
        SubscriberChanges {
            name: self.name.clone(),
            company: self.company.clone(),
            phone: self.phone.clone(),
            status: self.status,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::newsletter_subscribers)]
#[diesel(treat_none_as_null = true)]
pub struct SubscriberChanges {
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub status: SubscriberStatus,
    pub updated_at: NaiveDateTime,
}
