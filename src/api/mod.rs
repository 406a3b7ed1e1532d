//! REST API module.
//!
//! Handlers answer with the `{ success, data | error, revisionId }` envelope.
//! `revisionId` is the signed-in user's data revision: it moves whenever their
//! drops or analyses change, and clients drop cached lists when it does.

mod analyses;
mod drops;
mod questions;
mod users;

pub use analyses::*;
pub use drops::*;
pub use questions::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, RevisionedError};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, RevisionedError>;

/// Wrap the outcome of an operation in the envelope at `revision_id`.
pub fn respond<T: Serialize>(outcome: Result<T, AppError>, revision_id: i64) -> ApiResult<T> {
    match outcome {
        Ok(data) => Ok(ApiResponse {
            success: true,
            data,
            revision_id,
        }),
        Err(error) => Err(error.at_revision(revision_id)),
    }
}

/// Turn a missing row into `NotFound`.
fn require<T>(row: Option<T>, what: impl FnOnce() -> String) -> Result<T, AppError> {
    row.ok_or_else(|| AppError::NotFound(format!("{} not found", what())))
}

/// Current revision of `user_id`. A failed lookup is logged and reported as 0
/// so the request itself can still be answered.
async fn user_revision(state: &AppState, user_id: &str) -> i64 {
    match state.repo.get_revision_id(user_id).await {
        Ok(revision_id) => revision_id,
        Err(e) => {
            tracing::warn!(user_id, "Revision lookup failed: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_wraps_data() {
        let result = respond::<i64>(Ok(7), 3).unwrap();
        assert!(result.success);
        assert_eq!(result.data, 7);
        assert_eq!(result.revision_id, 3);
    }

    #[test]
    fn test_respond_keeps_revision_on_error() {
        let Err(err) = respond::<()>(Err(AppError::BadRequest("nope".to_string())), 5) else {
            panic!("expected an error");
        };
        assert_eq!(err.revision_id, 5);
        assert_eq!(err.error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_require_names_the_missing_row() {
        let Err(AppError::NotFound(message)) = require::<()>(None, || "Drop 4".to_string())
        else {
            panic!("expected NotFound");
        };
        assert_eq!(message, "Drop 4 not found");
        assert_eq!(require(Some(1), String::new).ok(), Some(1));
    }
}
