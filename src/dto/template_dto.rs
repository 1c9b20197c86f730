use crate::models::question::QuestionType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestion {
    #[validate(length(min = 1, message = "Question text must not be empty"))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<JsonValue>,
    #[serde(default)]
    pub correct_answer: Option<JsonValue>,
    #[validate(range(min = 0, max = 10000, message = "Points must be between 0 and 10000"))]
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplatePayload {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Pass score threshold must not be negative"))]
    pub pass_score_threshold: i32,
    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: Option<i32>,
    #[validate(length(min = 1, message = "A template needs at least one question"))]
    pub questions: Vec<CreateQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplatePayload {
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderQuestionsPayload {
    #[validate(length(min = 1, message = "questionIds must not be empty"))]
    pub question_ids: Vec<Uuid>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ListTemplatesQuery {
    pub active_only: Option<bool>,
}
