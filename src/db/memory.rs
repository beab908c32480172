use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{StoreError, UserStore};
use crate::models::User;

/// Process-local user store keyed by username.
///
/// Every conditional write re-checks its precondition while holding the
/// entry's shard lock, so it is atomic with respect to other writers.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn username_for_token(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        self.users
            .iter()
            .find(|entry| entry.value().has_valid_token(token, now))
            .map(|entry| entry.key().clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn find_by_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().has_valid_token(token, now))
            .map(|entry| entry.value().clone()))
    }

    async fn replace_reset_token(
        &self,
        user: &User,
        expected: Option<&str>,
    ) -> Result<bool, StoreError> {
        let Some(mut stored) = self.users.get_mut(&user.username) else {
            return Ok(false);
        };
        if stored.id != user.id || stored.reset_token() != expected {
            return Ok(false);
        }

        match (user.reset_token(), user.reset_token_expiry()) {
            (Some(token), Some(expires_at)) => stored.begin_reset(token.to_string(), expires_at),
            _ => stored.clear_reset(),
        }
        Ok(true)
    }

    async fn consume_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        // The iterator's read locks must be released before taking a write lock.
        let Some(username) = self.username_for_token(token, now) else {
            return Ok(None);
        };
        let Some(mut stored) = self.users.get_mut(&username) else {
            return Ok(None);
        };
        if !stored.has_valid_token(token, now) {
            return Ok(None);
        }

        stored.password_hash = password_hash.to_string();
        stored.clear_reset();
        Ok(Some(stored.value().clone()))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut purged = 0;
        for mut entry in self.users.iter_mut() {
            if entry.reset_token_expiry().is_some_and(|expires_at| expires_at <= now) {
                entry.clear_reset();
                purged += 1;
            }
        }
        Ok(purged)
    }
}
