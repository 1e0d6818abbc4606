use std::sync::{Arc, Mutex};

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;
use tracing::info;

use crate::repositories::SharedConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to connect to {url}: {source}")]
    Connection {
        url: String,
        source: diesel::ConnectionError,
    },
    #[error("failed to run migrations: {0}")]
    Migration(String),
}

/// Opens the database and brings its schema up to date.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection, DbError> {
    let mut connection =
        SqliteConnection::establish(database_url).map_err(|source| DbError::Connection {
            url: database_url.to_string(),
            source,
        })?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| DbError::Migration(err.to_string()))?;
    if !applied.is_empty() {
        info!(count = applied.len(), "Applied pending migrations");
    }

    Ok(connection)
}

pub fn shared(connection: SqliteConnection) -> SharedConnection {
    Arc::new(Mutex::new(connection))
}
