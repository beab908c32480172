pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod models;
pub mod reset;
pub mod routes;
pub mod state;
pub mod worker;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::PasswordHasher;
use crate::config::SeedUser;
use crate::db::{StoreError, UserStore};
use crate::models::User;
use crate::state::SharedState;

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::reset_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Create the configured seed users, skipping usernames that already exist.
/// Returns how many were created.
pub async fn seed_users(
    store: &dyn UserStore,
    hasher: &dyn PasswordHasher,
    seeds: &[SeedUser],
) -> Result<usize, String> {
    let mut created = 0;
    for seed in seeds {
        let hash = hasher.hash(&seed.password).await?;
        match store
            .insert(&User::new(&seed.username, &seed.email, &hash))
            .await
        {
            Ok(()) => {
                tracing::info!(username = %seed.username, "Seeded user");
                created += 1;
            }
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(username = %seed.username, "Seed user already exists");
            }
            Err(e) => return Err(format!("Failed to seed user '{}': {e}", seed.username)),
        }
    }
    Ok(created)
}
