pub mod reset;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn reset_routes() -> Router<SharedState> {
    Router::new()
        .route("/forget-password", post(reset::forget_password))
        .route("/verify-token/{token}", get(reset::verify_token))
        .route("/reset-password", post(reset::reset_password))
}
