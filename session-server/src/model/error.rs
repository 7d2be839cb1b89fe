//! Authentication and storage errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("User already exists")]
    AlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Unique constraint violated")]
    Conflict,
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] argon2::password_hash::Error),
    #[error("Invalid timestamp stored: {0}")]
    InvalidTimestamp(i64),
    #[error("Session expiry out of range")]
    ExpiryOutOfRange,
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Maps insertion errors, turning unique constraint violations into `Conflict`
    pub(crate) fn on_insert(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => Self::Conflict,
            _ => Self::Database(err),
        }
    }

    /// Whether the error is caused by the infrastructure rather than the caller
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Hashing(_)
                | Self::InvalidTimestamp(_)
                | Self::ExpiryOutOfRange
                | Self::Blocking(_)
                | Self::Database(_)
        )
    }
}
