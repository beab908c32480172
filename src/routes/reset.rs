use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::email::templates;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::reset::{IssuedToken, ResetError};
use crate::state::{AppState, SharedState};

#[derive(Deserialize)]
pub struct ForgetPasswordRequest {
    pub username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Expiry in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

impl ResetResponse {
    fn ok(message: &str) -> Self {
        Self {
            message: message.to_string(),
            success: true,
            token: None,
            expires: None,
        }
    }

    fn email_sent(issued: Option<IssuedToken>) -> Self {
        let mut resp = Self::ok("Password reset email sent successfully");
        if let Some(issued) = issued {
            resp.token = Some(issued.token);
            resp.expires = Some(issued.expires_at.timestamp_millis());
        }
        resp
    }
}

fn unexpected(state: &AppState, err: impl std::fmt::Display) -> AppError {
    AppError::Internal {
        detail: err.to_string(),
        expose: state.config.expose_error_details,
    }
}

fn unavailable(state: &AppState, err: impl std::fmt::Display) -> AppError {
    AppError::Unavailable {
        detail: err.to_string(),
        expose: state.config.expose_error_details,
    }
}

fn token_error(state: &AppState, err: ResetError) -> AppError {
    match err {
        ResetError::InvalidToken | ResetError::MissingPassword => {
            AppError::BadRequest(err.to_string())
        }
        other => unexpected(state, other),
    }
}

pub async fn forget_password(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ForgetPasswordRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    let config = &state.config;

    let user = match state.store.find_by_username(&req.username).await {
        Ok(Some(user)) => user,
        Ok(None) if config.reveal_unknown_users => {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(None) => {
            tracing::info!(username = %req.username, "Password reset requested for unknown user");
            return Ok(Json(ResetResponse::email_sent(None)));
        }
        Err(e) => return Err(unavailable(&state, e)),
    };

    let issued = state
        .tokens
        .generate(&user)
        .await
        .map_err(|e| unavailable(&state, e))?;

    let mail = templates::password_reset_mail(
        &config.mail_from,
        &user.email,
        &user.username,
        &issued.token,
        state.tokens.ttl(),
    );

    // The token stays persisted if delivery fails.
    state
        .mailer
        .send(&mail)
        .await
        .map_err(|detail| AppError::MailDelivery {
            detail,
            expose: config.expose_error_details,
        })?;

    tracing::info!(username = %user.username, "Password reset email sent");

    // Never exposed while unknown users are concealed.
    let exposed = (config.expose_reset_token && config.reveal_unknown_users).then_some(issued);
    Ok(Json(ResetResponse::email_sent(exposed)))
}

pub async fn verify_token(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<ResetResponse>, AppError> {
    state
        .tokens
        .validate(&token)
        .await
        .map_err(|e| token_error(&state, e))?;

    Ok(Json(ResetResponse::ok("Token is valid")))
}

pub async fn reset_password(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    state
        .tokens
        .consume(&req.token, &req.new_password)
        .await
        .map_err(|e| token_error(&state, e))?;

    Ok(Json(ResetResponse::ok("Password successfully reset")))
}
