//! Operator login and logout.
//!
//! `POST /api/auth/login`: unprotected: checks the configured credentials
//! `POST /api/auth/logout`: protected: revokes the caller's token

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::api::types::{generate_token, hash_token, ApiContext, UserContext};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

fn credentials_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let source = request.username.trim().to_lowercase();

    {
        let mut lockout = ctx
            .login_lockout
            .lock()
            .map_err(|_| ApiError::Internal("lockout lock".into()))?;
        lockout
            .check(&source)
            .map_err(|retry_after| ApiError::TooManyAttempts { retry_after })?;
    }

    let config = &ctx.core.config;
    // Evaluate both comparisons so timing does not reveal which one failed
    let user_ok = credentials_match(&config.admin_user, request.username.trim());
    let password_ok = credentials_match(&config.admin_password, &request.password);

    if !(user_ok & password_ok) {
        if let Ok(mut lockout) = ctx.login_lockout.lock() {
            lockout.record_failure(&source);
        }
        tracing::warn!(username = %source, "Failed login attempt");
        return Err(ApiError::InvalidCredentials);
    }

    if let Ok(mut lockout) = ctx.login_lockout.lock() {
        lockout.clear(&source);
    }

    let token = generate_token();
    ctx.core.start_session(hash_token(&token), &config.admin_user)?;
    tracing::info!(username = %config.admin_user, "Operator logged in");

    Ok(Json(LoginResponse {
        success: true,
        username: config.admin_user.clone(),
        token,
        expires_in: ctx.core.session_ttl().as_secs(),
    }))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<LogoutResponse>, ApiError> {
    ctx.core.end_session(&user.token_hash)?;
    tracing::info!(username = %user.username, "Operator logged out");
    Ok(Json(LogoutResponse { success: true }))
}
