//! Sessions storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;

use crate::model::error::{Error, Result};
use crate::model::token::SessionToken;
use crate::model::users::UserId;
use crate::model::{from_millis, now};

/// Newtype for session id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SessionId(i64);

/// Session data
///
/// Sessions are never modified after creation. A session is valid as long as `expires_at` is in
/// the future, regardless of whether the sweep has removed it yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    /// User owning this session
    pub user_id: UserId,
    /// Session token
    pub token: SessionToken,
    /// Session expiration time
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

type SessionRow = (SessionId, UserId, SessionToken, i64, i64);

impl Session {
    fn from_row((id, user_id, token, expires_at, created_at): SessionRow) -> Result<Self> {
        Ok(Self {
            id,
            user_id,
            token,
            expires_at: from_millis(expires_at)?,
            created_at: from_millis(created_at)?,
        })
    }

    /// Stores a new session
    ///
    /// Fails with `Conflict` if the token is already used by another session.
    pub async fn create(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        user_id: UserId,
        token: SessionToken,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        let created_at = now();
        let expires_at = from_millis(expires_at.timestamp_millis())?;

        let result = sqlx::query(
            "insert into sessions (user_id, token, expires_at, created_at) values (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(expires_at.timestamp_millis())
        .bind(created_at.timestamp_millis())
        .execute(db)
        .await
        .map_err(Error::on_insert)?;

        Ok(Self {
            id: SessionId(result.last_insert_rowid()),
            user_id,
            token,
            expires_at,
            created_at,
        })
    }

    /// Finds a session by its token, filtering out sessions expired at `now`
    pub async fn find_valid(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "select id, user_id, token, expires_at, created_at from sessions where token = ? and expires_at > ?",
        )
        .bind(token)
        .bind(now.timestamp_millis())
        .fetch_optional(db)
        .await?;

        row.map(Self::from_row).transpose()
    }

    /// Deletes the session with given token, if it exists
    pub async fn delete_by_token(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        token: &str,
    ) -> Result<()> {
        sqlx::query("delete from sessions where token = ?")
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Removes sessions expired before `now`, returning how many were removed
    pub async fn delete_expired(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query("delete from sessions where expires_at < ?")
            .bind(now.timestamp_millis())
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
