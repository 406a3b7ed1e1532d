//! Drop (journal entry) endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{require, respond, user_revision, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateEntryRequest, Entry, LatestEntry};
use crate::AppState;

/// Recent-drops query parameters.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Number of drops to return (default: 3).
    #[serde(default = "default_recent")]
    pub n: i64,
}

fn default_recent() -> i64 {
    3
}

const MAX_RECENT: i64 = 100;

/// GET /api/drops - The user's drops in insertion order.
pub async fn list_drops(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Entry>> {
    let revision_id = user_revision(&state, &user.user_id).await;
    respond(state.repo.list_entries(&user.user_id).await, revision_id)
}

/// GET /api/drops/recent - The first `n` drops of the listing.
pub async fn recent_drops(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<RecentQuery>,
) -> ApiResult<Vec<Entry>> {
    let revision_id = user_revision(&state, &user.user_id).await;

    if params.n < 0 {
        let err = AppError::BadRequest("n must not be negative".to_string());
        return Err(err.at_revision(revision_id));
    }

    let entries = state
        .repo
        .recent_entries(&user.user_id, params.n.min(MAX_RECENT))
        .await;
    respond(entries, revision_id)
}

/// GET /api/drops/latest - ID of the most recently created drop, or null.
pub async fn latest_drop(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<LatestEntry> {
    let revision_id = user_revision(&state, &user.user_id).await;
    let latest = state
        .repo
        .latest_entry_id(&user.user_id)
        .await
        .map(|id| LatestEntry { id });
    respond(latest, revision_id)
}

/// GET /api/drops/{id}
pub async fn get_drop(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Entry> {
    let revision_id = user_revision(&state, &user.user_id).await;
    let entry = state
        .repo
        .get_entry(&user.user_id, id)
        .await
        .and_then(|row| require(row, || format!("Drop {}", id)));
    respond(entry, revision_id)
}

/// POST /api/drops - Answer a question.
///
/// Success carries the revision after the write; a rejected answer carries the
/// unchanged one.
pub async fn create_drop(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateEntryRequest>,
) -> ApiResult<Entry> {
    let now = state.clock.now();
    let recorded = state
        .repo
        .record_answer(&user.user_id, request.question_id, &request.text, now)
        .await;

    let revision_id = user_revision(&state, &user.user_id).await;
    respond(recorded, revision_id)
}
