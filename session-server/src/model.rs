//! Service global model

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use color_eyre::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

pub mod auth;
pub mod error;
pub mod password;
pub mod sessions;
pub mod token;
pub mod users;

use crate::config;
use crate::model::auth::Auth;
use crate::model::password::Hasher;

#[derive(Debug, Clone, Error)]
pub enum SetupError {
    #[error("Invalid SQLite path: {path}")]
    InvalidSQLitePath { path: PathBuf },
    #[error(
        "Session lifetime must be between 1 and {max} days, got {days}",
        max = MAX_SESSION_LIFETIME_DAYS
    )]
    InvalidSessionLifetime { days: u32 },
}

/// Longest session lifetime accepted from the configuration
pub const MAX_SESSION_LIFETIME_DAYS: u32 = 36_500;

/// Session lifetime for the configured number of days
fn session_lifetime(days: u32) -> Result<TimeDelta, SetupError> {
    if !(1..=MAX_SESSION_LIFETIME_DAYS).contains(&days) {
        return Err(SetupError::InvalidSessionLifetime { days });
    }

    Ok(TimeDelta::days(days.into()))
}

/// Shared service state
#[derive(Debug, Clone)]
pub struct Model {
    /// Database access
    db: sqlx::SqlitePool,
    /// Password hasher
    hasher: Hasher,
    /// Lifetime of newly issued sessions
    session_lifetime: TimeDelta,
}

impl Model {
    /// Model for testing purposes - using the in-memory SQLite database and cheap password hashing
    #[cfg(test)]
    pub async fn test() -> Result<Self> {
        let db = memory_pool(1)?;
        sqlx::migrate!("model/migrations").run(&db).await?;

        Ok(Self {
            db,
            hasher: password::test_hasher(),
            session_lifetime: TimeDelta::days(7),
        })
    }

    /// Model from configuration
    ///
    /// If the database is created in-memory, the migrations are being executed automatically. If database is
    /// file based migrations would be executed only if requested by configuration.
    pub async fn with_config(db: config::Database, auth: &config::Auth) -> Result<Self> {
        use config::Database::*;

        let session_lifetime = session_lifetime(auth.session_lifetime_days)?;

        let db = match db {
            Memory { max_connections } => {
                let pool = memory_pool(max_connections)?;
                sqlx::migrate!("model/migrations").run(&pool).await?;
                pool
            }

            SqLite {
                path,
                max_connections,
                migrate,
            } => {
                let path = path
                    .as_path()
                    .to_str()
                    .ok_or_else(|| SetupError::InvalidSQLitePath { path: path.clone() })?;

                let opts = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .foreign_keys(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_lazy_with(opts);

                if migrate {
                    sqlx::migrate!("model/migrations").run(&pool).await?;
                }

                pool
            }
        };

        Ok(Self {
            db,
            hasher: Hasher::new(auth.hashing)?,
            session_lifetime,
        })
    }

    /// Accesses the DB pool
    pub fn db(&self) -> &sqlx::SqlitePool {
        &self.db
    }

    /// Accesses the session service
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(&self.db, &self.hasher, self.session_lifetime)
    }

    /// Removes sessions which already expired, returning how many were removed
    pub async fn cleanup(&self) -> Result<u64> {
        let removed = self.auth().cleanup_expired(Utc::now()).await?;
        Ok(removed)
    }
}

/// In-memory pool; the database lives as long as any connection is kept open
fn memory_pool(max_connections: u32) -> Result<sqlx::SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_lazy_with(opts);

    Ok(pool)
}

/// Current time at the precision timestamps are stored with
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Converts stored Unix milliseconds
pub(crate) fn from_millis(millis: i64) -> error::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(error::Error::InvalidTimestamp(millis))
}

#[cfg(test)]
pub(crate) async fn setup_pool() -> sqlx::SqlitePool {
    let pool = memory_pool(1).unwrap();
    sqlx::migrate!("model/migrations").run(&pool).await.unwrap();
    pool
}
