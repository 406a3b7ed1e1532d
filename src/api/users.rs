//! User and session endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{require, respond, user_revision, ApiResult};
use crate::auth::{self, CurrentUser};
use crate::errors::AppError;
use crate::models::{CreateSessionRequest, Session, User};
use crate::AppState;

/// GET /api/me - The signed-in user.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<User> {
    let revision_id = user_revision(&state, &user.user_id).await;
    let profile = state
        .repo
        .get_user(&user.user_id)
        .await
        .and_then(|row| require(row, || format!("User {}", user.user_id)));
    respond(profile, revision_id)
}

/// DELETE /api/auth/session - Sign out of the current session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<()> {
    let revision_id = user_revision(&state, &user.user_id).await;
    respond(state.repo.delete_session(&user.token_hash).await, revision_id)
}

/// POST /service/sessions - Mint a session after the identity provider signed the user in.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<Session> {
    let session = mint_session(&state, &request).await;
    let revision_id = match &session {
        Ok(session) => user_revision(&state, &session.user_id).await,
        Err(_) => 0,
    };
    respond(session, revision_id)
}

async fn mint_session(
    state: &AppState,
    request: &CreateSessionRequest,
) -> Result<Session, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::Validation("userId is required".to_string()));
    }

    let now = state.clock.now();
    let user = state.repo.upsert_user(request, now).await?;

    let token = auth::generate_token();
    let expires_at = now + state.config.session_ttl;
    state
        .repo
        .create_session(&user.id, &auth::hash_token(&token), now, expires_at)
        .await?;

    tracing::info!(user_id = %user.id, "Created session");

    Ok(Session {
        token,
        user_id: user.id,
        expires_at,
    })
}

/// DELETE /service/users/{id} - Delete an account and everything it owns.
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let deleted = state.repo.delete_user(&id).await;
    if deleted.is_ok() {
        tracing::info!(user_id = %id, "Deleted user");
    }
    respond(deleted, 0)
}
