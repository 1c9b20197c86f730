use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub submitted_value: Option<JsonValue>,
    /// `None` when the question cannot be graded automatically.
    pub is_correct: Option<bool>,
    pub points_earned: i32,
    pub needs_review: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub question_id: Uuid,
    pub submitted_value: Option<JsonValue>,
    pub is_correct: Option<bool>,
    pub points_earned: i32,
    pub needs_review: bool,
}

/// Per-question answer counts over a template's completed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct AnswerTally {
    pub question_id: Uuid,
    pub answered: i64,
    pub correct: i64,
}
