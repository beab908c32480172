use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{StoreError, UserStore};
use crate::models::User;

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, reset_token, reset_token_expiry, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.reset_token())
        .bind(user.reset_token_expiry())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict(
                format!("username '{}' already exists", user.username),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE reset_token = $1 AND reset_token_expiry > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn replace_reset_token(
        &self,
        user: &User,
        expected: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expiry = $3
             WHERE id = $1 AND reset_token IS NOT DISTINCT FROM $4",
        )
        .bind(user.id)
        .bind(user.reset_token())
        .bind(user.reset_token_expiry())
        .bind(expected)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn consume_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = $3, reset_token = NULL, reset_token_expiry = NULL
             WHERE reset_token = $1 AND reset_token_expiry > $2
             RETURNING *",
        )
        .bind(token)
        .bind(now)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expiry = NULL
             WHERE reset_token_expiry <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
