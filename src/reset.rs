//! Reset token lifecycle: issue, validate, consume.
//!
//! A user has at most one pending token. Issuing a new one overwrites the
//! previous token, and consuming a token clears it in the same write that
//! replaces the password hash.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::auth::PasswordHasher;
use crate::db::{StoreError, UserStore};
use crate::models::User;

/// Random bytes per token; hex encoding doubles the length.
pub const TOKEN_BYTES: usize = 20;
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const MAX_ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ResetError {
    InvalidToken,
    MissingPassword,
    /// Concurrent writers kept replacing the token, or the user vanished.
    Contended,
    Hash(String),
    Store(StoreError),
}

impl std::fmt::Display for ResetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetError::InvalidToken => write!(f, "Invalid or expired token"),
            ResetError::MissingPassword => write!(f, "New password is required"),
            ResetError::Contended => write!(f, "Reset token was modified concurrently"),
            ResetError::Hash(msg) => write!(f, "Password hashing failed: {msg}"),
            ResetError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ResetError {}

impl From<StoreError> for ResetError {
    fn from(err: StoreError) -> Self {
        ResetError::Store(err)
    }
}

pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}

pub struct TokenManager {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>, ttl: Duration) -> Self {
        Self { store, hasher, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh token for `user`, replacing any pending one.
    pub async fn generate(&self, user: &User) -> Result<IssuedToken, ResetError> {
        self.generate_at(user, Utc::now()).await
    }

    async fn generate_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, ResetError> {
        let mut current = user.clone();

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let issued = IssuedToken {
                token: generate_token(),
                expires_at: now + self.ttl,
            };
            let previous = current.reset_token().map(str::to_string);
            current.begin_reset(issued.token.clone(), issued.expires_at);

            if self
                .store
                .replace_reset_token(&current, previous.as_deref())
                .await?
            {
                tracing::debug!(username = %user.username, "Issued password reset token");
                return Ok(issued);
            }

            tracing::debug!(
                username = %user.username,
                attempt,
                "Reset token changed underneath us, re-reading user"
            );
            current = match self.store.find_by_username(&user.username).await? {
                Some(fresh) if fresh.id == user.id => fresh,
                _ => break,
            };
        }

        tracing::warn!(username = %user.username, "Gave up issuing reset token");
        Err(ResetError::Contended)
    }

    /// The user holding `token`, if it matches exactly and has not expired.
    pub async fn validate(&self, token: &str) -> Result<User, ResetError> {
        self.validate_at(token, Utc::now()).await
    }

    async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<User, ResetError> {
        if token.is_empty() {
            return Err(ResetError::InvalidToken);
        }
        self.store
            .find_by_valid_token(token, now)
            .await?
            .ok_or(ResetError::InvalidToken)
    }

    /// Set a new password with `token` and invalidate it. Single use.
    pub async fn consume(&self, token: &str, new_password: &str) -> Result<User, ResetError> {
        self.validate(token).await?;
        if new_password.is_empty() {
            return Err(ResetError::MissingPassword);
        }

        let password_hash = self
            .hasher
            .hash(new_password)
            .await
            .map_err(ResetError::Hash)?;

        // Expiry is checked again at write time; the token may have lapsed while hashing.
        // Also loses to any write that replaced or consumed the token since validation.
        let user = self
            .store
            .consume_token(token, Utc::now(), &password_hash)
            .await?
            .ok_or(ResetError::InvalidToken)?;

        tracing::info!(username = %user.username, "Password reset completed");
        Ok(user)
    }
}
