pub mod memory;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::User;

pub use memory::MemoryUserStore;
pub use users::PgUserStore;

#[derive(Debug)]
pub enum StoreError {
    Conflict(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            StoreError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Persistence for user records and the reset token stored on them.
///
/// Token writes are conditional so that two concurrent requests for the
/// same user cannot silently lose each other's update.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Conflict` if the username is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// The user whose reset token equals `token` and expires after `now`.
    async fn find_by_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Write the reset token pair of `user`, but only if the stored token is
    /// still `expected` (`None` meaning no pending reset). Returns whether
    /// the write happened.
    async fn replace_reset_token(
        &self,
        user: &User,
        expected: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Atomically set `password_hash` and clear the reset token pair on the
    /// user holding `token`, provided it is still valid at `now`. Returns the
    /// updated user, or `None` if nothing matched.
    async fn consume_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Clear every reset token that expired at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
