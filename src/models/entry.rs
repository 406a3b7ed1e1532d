//! Journal entry ("drop") model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single journal submission.
///
/// `question_text` is a snapshot of the question at creation time and is
/// never re-derived from the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    pub user_id: String,
    pub question_id: i64,
    pub question_text: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub message_count: i64,
}

/// Request body for submitting an answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub question_id: i64,
    pub text: String,
}

/// Result of a latest-entry lookup.
#[derive(Debug, Clone, Serialize)]
pub struct LatestEntry {
    pub id: Option<i64>,
}
