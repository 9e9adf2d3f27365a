//! The store interface: a narrow, opaque-by-contract set of
//! repository operations for accounts, channels, messages, groups, holders
//! and flags. This module ships the one concrete implementation the crate
//! runs with (SQLite via `sqlx`); nothing above this module depends on the
//! SQL engine, only on the repository method signatures.

mod accounts;
mod channels;
mod flags;
mod groups;
mod holders;
mod messages;
mod models;

pub use accounts::AccountRepository;
pub use channels::ChannelRepository;
pub use flags::{Flag, FlagRepository};
pub use groups::GroupRepository;
pub use holders::HolderRepository;
pub use messages::MessageRepository;
pub use models::{Account, Channel, ChatMessage, FlagQueryResult, Group, GroupFlag, GroupHolder};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors surfaced by any repository operation.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("no such {entity}: {name}")]
    NotFound { entity: &'static str, name: String },
    #[error("{entity} already exists: {name}")]
    Conflict { entity: &'static str, name: String },
}

/// Database handle with a shared connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (creating if missing) the store at `addr` and run migrations.
    ///
    /// `addr` is the opaque store connection string from config (`db-addr`);
    /// for the SQLite backend this is a file path, or `:memory:`.
    pub async fn connect(addr: &str) -> Result<Self, DbError> {
        let pool = if addr == ":memory:" {
            let options = SqliteConnectOptions::new()
                .filename("file::memory:")
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(addr).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(addr)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(addr = %addr, "database connected");

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        for statement in include_str!("../../migrations/001_init.sql").split(';') {
            let statement = statement.trim();
            if statement.is_empty() || statement.starts_with("--") {
                continue;
            }
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn accounts(&self) -> accounts::AccountRepository<'_> {
        accounts::AccountRepository::new(&self.pool)
    }

    pub fn channels(&self) -> channels::ChannelRepository<'_> {
        channels::ChannelRepository::new(&self.pool)
    }

    pub fn messages(&self) -> messages::MessageRepository<'_> {
        messages::MessageRepository::new(&self.pool)
    }

    pub fn groups(&self) -> groups::GroupRepository<'_> {
        groups::GroupRepository::new(&self.pool)
    }

    pub fn flags(&self) -> flags::FlagRepository<'_> {
        flags::FlagRepository::new(&self.pool)
    }

    pub fn holders(&self) -> holders::HolderRepository<'_> {
        holders::HolderRepository::new(&self.pool)
    }
}
