//! Reflection question model.

use serde::{Deserialize, Serialize};

/// One question from the append-only pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
}

/// Request body for appending a question to the pool.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionRequest {
    pub text: String,
}
