//! SQLite connection setup for the local relational store.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

/// Failure to bring a store pool up.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Cannot create store directory {path}: {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot open store: {0}")]
    Open(#[from] sqlx::Error),

    #[error("Store schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Where the pool's database lives.
#[derive(Debug, Clone, Copy)]
pub enum StoreLocation<'a> {
    File(&'a Path),
    /// Private in-memory database, one connection so every query sees it.
    Memory,
}

/// Open a pool and bring its schema up to date.
///
/// File databases run in WAL mode with a 5s busy timeout; the parent
/// directory is created when missing.
pub async fn open_migrated(
    location: StoreLocation<'_>,
    migrator: &Migrator,
) -> Result<SqlitePool, PoolError> {
    let (options, max_connections) = match location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| PoolError::Directory {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5));
            (options, 5)
        }
        StoreLocation::Memory => (SqliteConnectOptions::new().in_memory(true), 1),
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options.foreign_keys(true))
        .await?;
    migrator.run(&pool).await?;

    match location {
        StoreLocation::File(path) => info!(path = %path.display(), "Store ready"),
        StoreLocation::Memory => info!("In-memory store ready"),
    }
    Ok(pool)
}

/// Seconds since the Unix epoch.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
