//! Database Module
//!
//! SQLite connection pool, embedded migrations and entity repositories.

pub mod groups;
pub mod permissions;
pub mod roles;
pub mod seed;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::config::Config;
use crate::error::RbacResult;

/// Owns the SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open the database with WAL, foreign keys and a busy timeout, then migrate
    pub async fn new(config: &Config) -> RbacResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .optimize_on_close(true, None);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(options)
            .await?;

        tracing::info!(url = %config.database_url, "Database connection established (SQLite WAL)");

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> RbacResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> RbacResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

/// Open a transaction that takes the write lock up front.
///
/// A deferred transaction that reads before writing cannot upgrade its WAL
/// snapshot once another writer has committed; `BEGIN IMMEDIATE` waits on
/// `busy_timeout` instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> RbacResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Comma-separated `?` placeholders for an `IN (...)` clause
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
