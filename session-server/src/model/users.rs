//! Users storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;

use crate::model::error::{Error, Result};
use crate::model::{from_millis, now};

/// Newtype for user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// PHC string produced by the password hasher
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type UserRow = (UserId, String, String, i64, i64);

impl User {
    fn from_row((id, email, password_hash, created_at, updated_at): UserRow) -> Result<Self> {
        Ok(Self {
            id,
            email,
            password_hash,
            created_at: from_millis(created_at)?,
            updated_at: from_millis(updated_at)?,
        })
    }

    /// Creates user in the database
    ///
    /// Fails with `Conflict` if the email is already taken.
    pub async fn create(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Self> {
        let email = email.into();
        let password_hash = password_hash.into();
        let created_at = now();

        let result = sqlx::query(
            "insert into users (email, password_hash, created_at, updated_at) values (?, ?, ?, ?)",
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(created_at.timestamp_millis())
        .bind(created_at.timestamp_millis())
        .execute(db)
        .await
        .map_err(Error::on_insert)?;

        Ok(Self {
            id: UserId(result.last_insert_rowid()),
            email,
            password_hash,
            created_at,
            updated_at: created_at,
        })
    }

    /// Fetches user by their email
    pub async fn find_by_email(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        email: &str,
    ) -> Result<Option<Self>> {
        let row: Option<UserRow> = sqlx::query_as(
            "select id, email, password_hash, created_at, updated_at from users where email = ?",
        )
        .bind(email)
        .fetch_optional(db)
        .await?;

        row.map(Self::from_row).transpose()
    }

    /// Fetches user by their id
    pub async fn find_by_id(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        user_id: UserId,
    ) -> Result<Option<Self>> {
        let row: Option<UserRow> = sqlx::query_as(
            "select id, email, password_hash, created_at, updated_at from users where id = ?",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        row.map(Self::from_row).transpose()
    }

    /// Deletes the user together with all their sessions. Returns whether the user existed.
    pub async fn delete(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        user_id: UserId,
    ) -> Result<bool> {
        let result = sqlx::query("delete from users where id = ?")
            .bind(user_id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
