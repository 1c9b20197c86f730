use crate::models::attempt::{Attempt, AttemptFilter, AttemptStatus};
use crate::models::question::QuestionType;
use crate::services::grading_service::QuestionGrade;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub candidate_id: Uuid,
    pub template_id: Uuid,
}

/// Admin listing filter; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListAttemptsQuery {
    pub candidate_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub status: Option<AttemptStatus>,
}

impl From<ListAttemptsQuery> for AttemptFilter {
    fn from(q: ListAttemptsQuery) -> Self {
        Self {
            candidate_id: q.candidate_id,
            template_id: q.template_id,
            status: q.status,
        }
    }
}

/// Answers keyed by question id. Keys stay strings here so a malformed id
/// is reported as a validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    pub answers: HashMap<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub attempt_id: Uuid,
    pub status: AttemptStatus,
    pub score: i32,
    pub max_score: i32,
    pub passed: bool,
    pub needs_review: bool,
    pub per_question: Vec<QuestionGrade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub question_id: Uuid,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub order_index: i32,
    pub submitted: Option<JsonValue>,
    pub correct_answer: Option<JsonValue>,
    pub is_correct: Option<bool>,
    pub points_earned: i32,
    pub max_points: i32,
    pub needs_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResultsResponse {
    pub attempt: Attempt,
    pub questions: Vec<QuestionReview>,
}
