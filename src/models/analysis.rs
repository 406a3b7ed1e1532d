//! AI-generated analysis model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An analysis of a user's journaling history, produced by an external analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    /// Number of entries the analyzer looked at
    pub drop_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Request body for storing an analysis.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisRequest {
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub drop_count: Option<i64>,
}
