use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::{NewQuestion, Question};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    /// Shared by every version of the same assessment.
    pub lineage_id: Uuid,
    pub version: i32,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub pass_score_threshold: i32,
    pub time_limit_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    #[serde(flatten)]
    pub template: Template,
    pub max_score: i32,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    /// `Some` when this is a revision of an existing lineage.
    pub lineage_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub pass_score_threshold: i32,
    pub time_limit_minutes: Option<i32>,
    pub questions: Vec<NewQuestion>,
}
