#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use pwreset::auth::{Argon2Hasher, PasswordHasher};
use pwreset::config::Config;
use pwreset::db::{MemoryUserStore, PgUserStore, StoreError, UserStore};
use pwreset::email::{MailNotifier, OutgoingMail};
use pwreset::models::User;
use pwreset::reset::DEFAULT_TOKEN_TTL_SECS;
use pwreset::state::AppState;

/// Mail double that records every delivery attempt and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl MailNotifier for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(message);
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

/// Store whose every call fails, standing in for a lost database connection.
pub struct BrokenStore;

#[async_trait]
impl UserStore for BrokenStore {
    async fn insert(&self, _user: &User) -> Result<(), StoreError> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn find_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn find_by_valid_token(
        &self,
        _token: &str,
        _now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn replace_reset_token(
        &self,
        _user: &User,
        _expected: Option<&str>,
    ) -> Result<bool, StoreError> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn consume_token(
        &self,
        _token: &str,
        _now: DateTime<Utc>,
        _password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(sqlx::Error::PoolClosed.into())
    }
}

/// A running test server backed by an in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryUserStore>,
    pub mailer: Arc<RecordingMailer>,
    pub hasher: Arc<Argon2Hasher>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a user with the given plaintext password.
    pub async fn create_user(&self, username: &str, email: &str, password: &str) -> User {
        let hash = self.hasher.hash(password).await.expect("hash failed");
        let user = User::new(username, email, &hash);
        self.store.insert(&user).await.expect("insert user failed");
        user
    }

    pub async fn user(&self, username: &str) -> User {
        self.store
            .find_by_username(username)
            .await
            .unwrap()
            .expect("user missing")
    }

    pub async fn password_matches(&self, username: &str, password: &str) -> bool {
        let user = self.user(username).await;
        self.hasher.verify(password, &user.password_hash).await.unwrap()
    }

    pub async fn forget_password(&self, username: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/forget-password"))
            .json(&json!({ "username": username }))
            .send()
            .await
            .expect("forget-password request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn verify_token(&self, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(&format!("/verify-token/{token}")))
            .send()
            .await
            .expect("verify-token request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/reset-password"))
            .json(&json!({ "token": token, "newPassword": new_password }))
            .send()
            .await
            .expect("reset-password request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
        token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        sweep_interval: None,
        expose_reset_token: true,
        reveal_unknown_users: true,
        expose_error_details: true,
        argon2_memory_kib: 8,
        argon2_iterations: 1,
        mail_from: "noreply@test.com".to_string(),
        smtp: None,
        seed_users: vec![],
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryUserStore::new());
    spawn_with_store(config, store.clone(), store).await
}

/// Spawn with an arbitrary store behind the handlers. `store` is only used
/// by the test helpers.
pub async fn spawn_with_store(
    config: Config,
    store: Arc<MemoryUserStore>,
    app_store: Arc<dyn UserStore>,
) -> TestApp {
    let hasher = Arc::new(
        Argon2Hasher::new(config.argon2_memory_kib, config.argon2_iterations)
            .expect("invalid hasher params"),
    );
    let mailer = Arc::new(RecordingMailer::default());

    let state = Arc::new(AppState::new(
        config,
        app_store,
        hasher.clone(),
        mailer.clone(),
    ));
    let app = pwreset::build_app(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        store,
        mailer,
        hasher,
    }
}

/// A migrated, empty database of its own, or `None` when `DATABASE_URL`
/// is not set.
pub async fn pg_pool() -> Option<PgPool> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let db_name = format!("pwreset_test_{}", Uuid::now_v7().simple());

    // Connect to default postgres DB to create test DB
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(pool)
}

pub async fn pg_store() -> Option<(PgPool, Arc<PgUserStore>)> {
    let pool = pg_pool().await?;
    let store = Arc::new(PgUserStore::new(pool.clone()));
    Some((pool, store))
}
