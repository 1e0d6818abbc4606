/// Implements text-column storage for an enum with `as_str`/`FromStr`.
macro_rules! text_column {
    ($ty:ty) => {
        impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::sqlite::Sqlite> for $ty {
            fn from_sql(
                bytes: <diesel::sqlite::Sqlite as diesel::backend::Backend>::RawValue<'_>,
            ) -> diesel::deserialize::Result<Self> {
                let raw = <String as diesel::deserialize::FromSql<
                    diesel::sql_types::Text,
                    diesel::sqlite::Sqlite,
                >>::from_sql(bytes)?;
                Ok(raw.parse::<$ty>()?)
            }
        }

        impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::sqlite::Sqlite> for $ty {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, diesel::sqlite::Sqlite>,
            ) -> diesel::serialize::Result {
                out.set_value(self.as_str());
                Ok(diesel::serialize::IsNull::No)
            }
        }
    };
}

pub(crate) use text_column;

mod feed;
mod item;
mod newsletter;
mod subscriber;

pub use feed::{FeedSource, FeedStatus, FeedType};
pub use item::{Keywords, NewRssItem, RssItem, RssItemChanges};
pub use newsletter::{NewsletterRecord, RecipientSnapshot};
pub use subscriber::{NewSubscriber, Subscriber, SubscriberChanges, SubscriberStatus};

/// Unknown value for a text-backed enum column or field.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
