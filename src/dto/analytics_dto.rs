use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDifficulty {
    pub question_id: Uuid,
    pub order_index: i32,
    pub answered: i64,
    pub correct: i64,
    /// Share of completed attempts that got the question right, in percent.
    /// `None` for free-text questions and when nothing was completed yet.
    pub correct_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAnalytics {
    pub template_id: Uuid,
    pub attempts_started: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub abandoned: i64,
    pub average_score: Option<Decimal>,
    /// Percent of completed attempts that passed.
    pub pass_rate: Option<Decimal>,
    pub questions: Vec<QuestionDifficulty>,
}
