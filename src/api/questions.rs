//! Question pool endpoints.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};

use super::{respond, user_revision, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::journal::{self, TodaysQuestion};
use crate::models::{CreateQuestionRequest, Question};
use crate::AppState;

/// GET /api/questions - The pool in cycling order.
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Question>> {
    let revision_id = user_revision(&state, &user.user_id).await;
    respond(state.repo.list_questions().await, revision_id)
}

/// GET /api/questions/today - Today's question and whether the user answered it.
pub async fn get_todays_question(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<TodaysQuestion> {
    let revision_id = user_revision(&state, &user.user_id).await;
    let today = todays_question(&state, &user.user_id, state.clock.now()).await;
    respond(today, revision_id)
}

async fn todays_question(
    state: &AppState,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<TodaysQuestion, AppError> {
    let pool = state.repo.list_questions().await?;
    let question = journal::resolve_daily_question(&pool, now)
        .inspect_err(|e| tracing::warn!("Cannot resolve today's question: {}", e))?
        .clone();

    let entries = state.repo.list_entries(user_id).await?;
    let answered_today =
        journal::has_answered_today(&entries, Some(question.text.as_str()), now);

    Ok(TodaysQuestion {
        question,
        journaling_date: journal::journaling_date(now),
        answered_today,
    })
}

/// POST /service/questions - Append a question to the pool.
pub async fn create_question(
    State(state): State<AppState>,
    Json(request): Json<CreateQuestionRequest>,
) -> ApiResult<Question> {
    let text = request.text.trim();
    if text.is_empty() {
        let err = AppError::Validation("Question text is required".to_string());
        return Err(err.at_revision(0));
    }

    let created = state.repo.create_question(text).await;
    if let Ok(question) = &created {
        tracing::info!(question_id = question.id, "Appended question to pool");
    }
    respond(created, 0)
}
