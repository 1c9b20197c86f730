pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::{Answer, AnswerTally};
use crate::models::attempt::{Attempt, AttemptCompletion, AttemptFilter, NewAttempt};
use crate::models::question::Question;
use crate::models::template::{NewTemplate, Template};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence for templates, attempts and answers.
///
/// Implementations own the atomicity rules: `insert_attempt` must refuse a
/// second in-progress attempt for the same (candidate, template) pair with
/// `Error::Conflict`, and `complete_attempt` / `abandon_attempt` must
/// re-check the status under lock and fail with `Error::InvalidState` when
/// the attempt is no longer in progress, writing nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Inserts a template and its questions. When `lineage_id` is set the
    /// template becomes the next version of that lineage and every other
    /// version is deactivated.
    async fn insert_template(&self, template: NewTemplate) -> Result<(Template, Vec<Question>)>;

    async fn get_template(&self, id: Uuid) -> Result<Template>;

    /// Newest first.
    async fn list_templates(&self, active_only: bool) -> Result<Vec<Template>>;

    async fn set_template_active(&self, id: Uuid, is_active: bool) -> Result<Template>;

    /// Ordered by order index, then id.
    async fn list_questions(&self, template_id: Uuid) -> Result<Vec<Question>>;

    /// Rewrites order indices to 1..n following `question_ids`, which must be
    /// a permutation of the template's questions.
    async fn reorder_questions(
        &self,
        template_id: Uuid,
        question_ids: Vec<Uuid>,
    ) -> Result<Vec<Question>>;

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<Attempt>;

    async fn get_attempt(&self, id: Uuid) -> Result<Attempt>;

    /// Newest first.
    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>>;

    async fn complete_attempt(&self, completion: AttemptCompletion) -> Result<Attempt>;

    async fn abandon_attempt(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attempt>;

    /// Abandons every in-progress attempt whose deadline is at or before
    /// `cutoff`, stamping `completed_at = at`.
    async fn abandon_expired(&self, cutoff: DateTime<Utc>, at: DateTime<Utc>) -> Result<Vec<Uuid>>;

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>>;

    /// One row per question with stored answers, counting only completed
    /// attempts on `template_id`. `answered` skips missing submissions.
    async fn answer_tallies(&self, template_id: Uuid) -> Result<Vec<AnswerTally>>;
}
