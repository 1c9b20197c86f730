use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FreeText,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FreeText => "free_text",
        }
    }

    pub fn is_auto_graded(&self) -> bool {
        !matches!(self, QuestionType::FreeText)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(QuestionType::SingleChoice),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "true_false" => Ok(QuestionType::TrueFalse),
            "free_text" => Ok(QuestionType::FreeText),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub template_id: Uuid,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<JsonValue>,
    /// Scalar for single-choice and true/false, array for multiple-choice,
    /// absent for free-text.
    pub correct_answer: Option<JsonValue>,
    pub points: i32,
    pub order_index: i32,
}

/// Question as shown to a candidate taking the test: no answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<JsonValue>,
    pub points: i32,
    pub order_index: i32,
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            question_type: q.question_type,
            options: q.options,
            points: q.points,
            order_index: q.order_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub text: String,
    pub question_type: QuestionType,
    pub options: Vec<JsonValue>,
    pub correct_answer: Option<JsonValue>,
    pub points: i32,
}

/// Display and grading order: order index, then id.
pub fn sort_questions(questions: &mut [Question]) {
    questions.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
}

/// Upper bound on a single question's points, mirrored by a column CHECK.
pub const MAX_QUESTION_POINTS: i32 = 10_000;

/// Saturates instead of wrapping; templates are validated so the true sum
/// always fits.
pub fn max_score(questions: &[Question]) -> i32 {
    questions
        .iter()
        .fold(0i32, |acc, q| acc.saturating_add(q.points))
}
