//! Session service
//!
//! Registration, login and logout, and validation of session tokens. Expiry is checked lazily
//! whenever a token is validated; expired sessions are physically removed only by the periodic
//! sweep (`cleanup_expired`), which is not required for correctness.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, instrument, warn};

use crate::model::error::{Error, Result};
use crate::model::now;
use crate::model::password::Hasher;
use crate::model::sessions::Session;
use crate::model::token::SessionToken;
use crate::model::users::{User, UserId};

/// Result of a successful registration or login
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    /// Newly issued session
    pub session: Session,
}

/// Session service bound to the service state
pub struct Auth<'a> {
    db: &'a sqlx::SqlitePool,
    hasher: &'a Hasher,
    session_lifetime: TimeDelta,
}

impl<'a> Auth<'a> {
    pub(super) fn new(
        db: &'a sqlx::SqlitePool,
        hasher: &'a Hasher,
        session_lifetime: TimeDelta,
    ) -> Self {
        Self {
            db,
            hasher,
            session_lifetime,
        }
    }

    /// Registers a new user and opens their first session
    ///
    /// The email is checked before hashing, so a taken email is reported faster than a successful
    /// registration. Email existence is not treated as a secret.
    #[instrument(skip_all)]
    pub async fn register(&self, email: &str, password: &str) -> Result<SignedIn> {
        if User::find_by_email(self.db, email).await?.is_some() {
            return Err(Error::AlreadyExists);
        }

        let password_hash = self.hash(password).await?;
        let user = match User::create(self.db, email, password_hash).await {
            // Lost a race with a concurrent registration
            Err(Error::Conflict) => return Err(Error::AlreadyExists),
            user => user?,
        };

        let session = self.issue_session(user.id).await?;
        info!(user_id = %user.id, "User registered");

        Ok(SignedIn { user, session })
    }

    /// Authenticates user by credentials, opening a new session
    ///
    /// Unknown email and wrong password fail with the same `InvalidCredentials` error. Existing
    /// sessions of the user are kept.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let Some(user) = User::find_by_email(self.db, email).await? else {
            debug!("Login with unknown email");
            return Err(Error::InvalidCredentials);
        };

        if !self.verify(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(Error::InvalidCredentials);
        }

        let session = self.issue_session(user.id).await?;
        info!(user_id = %user.id, "User logged in");

        Ok(SignedIn { user, session })
    }

    /// Resolves the user owning a valid session with this token
    ///
    /// Empty, unknown and expired tokens all resolve to `None`.
    pub async fn validate(&self, token: &str) -> Result<Option<User>> {
        self.validate_at(token, now()).await
    }

    /// Like `validate`, but checks expiry against the given time
    pub async fn validate_at(&self, token: &str, at: DateTime<Utc>) -> Result<Option<User>> {
        if token.is_empty() {
            return Ok(None);
        }

        let Some(session) = Session::find_valid(self.db, token, at).await? else {
            return Ok(None);
        };

        let user = User::find_by_id(self.db, session.user_id).await?;
        if user.is_none() {
            warn!(user_id = %session.user_id, "Session owned by a missing user");
        }

        Ok(user)
    }

    /// Closes the session, doing nothing if it doesn't exist
    pub async fn logout(&self, token: &str) -> Result<()> {
        Session::delete_by_token(self.db, token).await
    }

    /// Removes sessions expired before `now`, returning how many were removed
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let removed = Session::delete_expired(self.db, now).await?;
        debug!(removed, "Expired sessions removed");
        Ok(removed)
    }

    /// Opens a brand new session for the user
    async fn issue_session(&self, user_id: UserId) -> Result<Session> {
        let expires_at = now()
            .checked_add_signed(self.session_lifetime)
            .ok_or(Error::ExpiryOutOfRange)?;
        Session::create(self.db, user_id, SessionToken::generate(), expires_at).await
    }

    async fn hash(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?;
        Ok(valid)
    }
}
