//! Analysis endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{require, respond, user_revision, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Analysis, CreateAnalysisRequest};
use crate::AppState;

/// GET /api/analyses - List the user's analyses, newest first.
pub async fn list_analyses(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Analysis>> {
    let revision_id = user_revision(&state, &user.user_id).await;
    respond(state.repo.list_analyses(&user.user_id).await, revision_id)
}

/// GET /api/analyses/{id}
pub async fn get_analysis(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Analysis> {
    let revision_id = user_revision(&state, &user.user_id).await;
    let analysis = state
        .repo
        .get_analysis(&user.user_id, id)
        .await
        .and_then(|row| require(row, || format!("Analysis {}", id)));
    respond(analysis, revision_id)
}

fn validate_analysis(request: &CreateAnalysisRequest) -> Result<(), AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation(
            "Analysis content is required".to_string(),
        ));
    }
    if matches!(request.drop_count, Some(count) if count < 0) {
        return Err(AppError::Validation(
            "dropCount must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// POST /service/analyses - Store an analysis from the analyzer.
pub async fn create_analysis(
    State(state): State<AppState>,
    Json(request): Json<CreateAnalysisRequest>,
) -> ApiResult<Analysis> {
    if let Err(e) = validate_analysis(&request) {
        return Err(e.at_revision(0));
    }

    let analysis = match state.repo.create_analysis(&request, state.clock.now()).await {
        Ok(analysis) => analysis,
        Err(e) => return Err(e.at_revision(0)),
    };

    tracing::info!(
        user_id = %analysis.user_id,
        analysis_id = analysis.id,
        "Stored analysis"
    );
    let revision_id = user_revision(&state, &analysis.user_id).await;
    respond(Ok(analysis), revision_id)
}
