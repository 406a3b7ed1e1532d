//! Authentication middleware.
//!
//! User routes carry a session token minted after the identity provider signs
//! the user in. Service routes (identity provider, analyzer) carry a
//! pre-shared key compared in constant time.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, ErrorResponse};
use crate::AppState;

/// Header name for the service key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The authenticated user, inserted into request extensions by [`session_auth_layer`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    /// SHA-256 of the session token used for this request
    pub token_hash: String,
}

/// Session authentication layer for user routes.
pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return unauthorized_response("Missing session token");
    };

    let token_hash = hash_token(&token);
    let now = state.clock.now();

    match state.repo.find_session_user(&token_hash, now).await {
        Ok(Some(user_id)) => {
            request.extensions_mut().insert(CurrentUser {
                user_id,
                token_hash,
            });
            next.run(request).await
        }
        Ok(None) => unauthorized_response("Invalid or expired session"),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            let body = ErrorResponse::new(&e, 0);
            (e.status_code(), Json(body)).into_response()
        }
    }
}

/// PSK authentication layer for service routes.
///
/// Without a configured key every request is rejected, since these routes
/// can mint sessions for any user.
pub async fn service_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected_psk else {
        return unauthorized_response("Service access is not configured");
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| bearer_token(&request));

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing API key"),
    }
}

/// Generate a new opaque session token.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Hex-encoded SHA-256 of a session token. Only the hash is persisted.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(&AppError::Unauthorized(message.to_string()), 0);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
