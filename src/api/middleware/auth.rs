//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it against the
//! operator sessions in `CoreState`, and injects `UserContext` into
//! request extensions for downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{bearer_token, hash_token, ApiContext, UserContext};

/// Require a valid operator session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
/// On success: injects `UserContext` and marks the response `Cache-Control: no-store`.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token_hash = {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header).ok_or(ApiError::Unauthorized)?;
        hash_token(token)
    };

    let session = ctx
        .core
        .session_for(&token_hash)?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(UserContext {
        username: session.username,
        token_hash,
    });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
