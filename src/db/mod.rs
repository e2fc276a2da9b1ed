mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

/// Pool size for the single-node store. SQLite serializes writers anyway.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to the SQLite store backing users, tweets, follows and notifications.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the chirp store at `path`, creating the file and any missing
    /// parent directories, then bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the connection
    /// fails, a migration fails, or the file turns out to be read-only.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(connect_options(path))
            .await
            .with_context(|| format!("Failed to open chirp database at {}", path.display()))?;

        migrations::run(&pool).await?;
        debug!("Schema is up to date");

        ensure_writable(&pool, path).await?;
        info!(path = %path.display(), "Chirp database ready");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn connect_options(path: &Path) -> SqliteConnectOptions {
    // Likes, follows and notifications rely on cascades when a tweet or user goes away.
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
}

/// Fail at startup rather than on the first post when the volume is read-only.
async fn ensure_writable(pool: &SqlitePool, path: &Path) -> Result<()> {
    let not_writable = || {
        format!(
            "Chirp database is not writable: {}. Check volume permissions",
            path.display()
        )
    };
    let tx = pool.begin().await.with_context(not_writable)?;
    tx.commit().await.with_context(not_writable)
}
