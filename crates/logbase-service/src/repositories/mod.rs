mod items;
mod subscribers;
mod traits;

pub use items::SqliteItemRepository;
pub use subscribers::SqliteSubscriberRepository;
pub use traits::{
    ItemRepository, ListItemsParams, ListItemsResult, SubscriberRepository,
};

use crate::errors::ApiError;
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

pub type SharedConnection = Arc<Mutex<SqliteConnection>>;

fn lock(db: &SharedConnection) -> Result<MutexGuard<'_, SqliteConnection>, ApiError> {
    db.lock().map_err(|_| {
        error!("Database connection mutex poisoned");
        ApiError::InternalError
    })
}
