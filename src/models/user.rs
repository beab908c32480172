use chrono::{DateTime, Utc};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// A user record. The reset token and its expiry are only ever written
/// together, through `begin_reset` and `clear_reset`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    reset_token: Option<String>,
    #[serde(skip_serializing)]
    reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, email: &str, password_hash: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reset_token: None,
            reset_token_expiry: None,
            created_at: Utc::now(),
        }
    }

    pub fn reset_token(&self) -> Option<&str> {
        self.reset_token.as_deref()
    }

    pub fn reset_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.reset_token_expiry
    }

    pub fn begin_reset(&mut self, token: String, expires_at: DateTime<Utc>) {
        self.reset_token = Some(token);
        self.reset_token_expiry = Some(expires_at);
    }

    pub fn clear_reset(&mut self) {
        self.reset_token = None;
        self.reset_token_expiry = None;
    }

    /// Exact, constant-time match of `token` against the pending reset,
    /// which must expire strictly after `now`.
    pub fn has_valid_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (self.reset_token.as_deref(), self.reset_token_expiry) {
            (Some(stored), Some(expires_at)) if !token.is_empty() => {
                bool::from(stored.as_bytes().ct_eq(token.as_bytes())) && now < expires_at
            }
            _ => false,
        }
    }
}
