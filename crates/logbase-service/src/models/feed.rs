use std::fmt;
use std::str::FromStr;

use diesel::expression::AsExpression;
use diesel::sql_types::Text;
use diesel::deserialize::FromSqlRow;
use serde::{Deserialize, Serialize};

use super::{UnknownVariant, text_column};

/// Where an item came from, which also decides how keywords filter it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Competitor,
    Noncompetitor,
    /// Posts written in the blog editor.
    Logbase,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Competitor => "competitor",
            FeedType::Noncompetitor => "noncompetitor",
            FeedType::Logbase => "logbase",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "competitor" => Ok(FeedType::Competitor),
            "noncompetitor" => Ok(FeedType::Noncompetitor),
            "logbase" => Ok(FeedType::Logbase),
            other => Err(UnknownVariant {
                kind: "feed type",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(FeedType);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    #[default]
    Active,
    Error,
}

/// One entry of `feeds/feeds.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub feed_type: FeedType,
    #[serde(default)]
    pub status: FeedStatus,
}

impl FeedSource {
    pub fn is_active(&self) -> bool {
        self.status == FeedStatus::Active
    }
}
