use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::AssessmentStore;
use crate::error::{Error, Result};
use crate::models::answer::{Answer, AnswerTally};
use crate::models::attempt::{
    Attempt, AttemptCompletion, AttemptFilter, AttemptStatus, NewAttempt,
};
use crate::models::question::Question;
use crate::models::template::{NewTemplate, Template};

const TEMPLATE_COLUMNS: &str = "id, lineage_id, version, title, description, is_active, \
     pass_score_threshold, time_limit_minutes, created_at";

const QUESTION_COLUMNS: &str = "id, template_id, question_text, question_type, options, \
     correct_answer, points, order_index";

const ATTEMPT_COLUMNS: &str = "id, candidate_id, template_id, status, started_at, expires_at, \
     completed_at, score, max_score, passed";

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: Uuid,
    lineage_id: Uuid,
    version: i32,
    title: String,
    description: Option<String>,
    is_active: bool,
    pass_score_threshold: i32,
    time_limit_minutes: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Self {
            id: row.id,
            lineage_id: row.lineage_id,
            version: row.version,
            title: row.title,
            description: row.description,
            is_active: row.is_active,
            pass_score_threshold: row.pass_score_threshold,
            time_limit_minutes: row.time_limit_minutes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct QuestionRow {
    id: Uuid,
    template_id: Uuid,
    question_text: String,
    question_type: String,
    options: JsonValue,
    correct_answer: Option<JsonValue>,
    points: i32,
    order_index: i32,
}

impl TryFrom<QuestionRow> for Question {
    type Error = Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            template_id: row.template_id,
            text: row.question_text,
            question_type: row.question_type.parse().map_err(Error::Internal)?,
            options: serde_json::from_value(row.options)
                .map_err(|e| Error::Internal(format!("malformed stored options: {}", e)))?,
            correct_answer: row.correct_answer,
            points: row.points,
            order_index: row.order_index,
        })
    }
}

#[derive(Debug, FromRow)]
struct AttemptRow {
    id: Uuid,
    candidate_id: Uuid,
    template_id: Uuid,
    status: String,
    started_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<i32>,
    max_score: i32,
    passed: Option<bool>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = Error;

    fn try_from(row: AttemptRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            candidate_id: row.candidate_id,
            template_id: row.template_id,
            status: row.status.parse().map_err(Error::Internal)?,
            started_at: row.started_at,
            expires_at: row.expires_at,
            completed_at: row.completed_at,
            score: row.score,
            max_score: row.max_score,
            passed: row.passed,
        })
    }
}

#[derive(Debug, FromRow)]
struct AnswerRow {
    id: Uuid,
    attempt_id: Uuid,
    question_id: Uuid,
    submitted_value: Option<JsonValue>,
    is_correct: Option<bool>,
    points_earned: i32,
    needs_review: bool,
    created_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Self {
            id: row.id,
            attempt_id: row.attempt_id,
            question_id: row.question_id,
            submitted_value: row.submitted_value,
            is_correct: row.is_correct,
            points_earned: row.points_earned,
            needs_review: row.needs_review,
            created_at: row.created_at,
        }
    }
}

fn into_questions(rows: Vec<QuestionRow>) -> Result<Vec<Question>> {
    rows.into_iter().map(Question::try_from).collect()
}

fn into_attempts(rows: Vec<AttemptRow>) -> Result<Vec<Attempt>> {
    rows.into_iter().map(Attempt::try_from).collect()
}

fn not_found(what: &str, id: Uuid) -> Error {
    Error::NotFound(format!("{} {} not found", what, id))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn questions_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
    ) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM assessment_questions WHERE template_id = $1 ORDER BY order_index, id",
            QUESTION_COLUMNS
        ))
        .bind(template_id)
        .fetch_all(&mut **tx)
        .await?;
        into_questions(rows)
    }

    async fn lock_in_progress(
        tx: &mut Transaction<'_, Postgres>,
        attempt_id: Uuid,
    ) -> Result<AttemptRow> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM assessment_attempts WHERE id = $1 FOR UPDATE",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| not_found("Attempt", attempt_id))?;

        if row.status != AttemptStatus::InProgress.as_str() {
            return Err(Error::InvalidState(format!(
                "Attempt {} is {}",
                row.id, row.status
            )));
        }
        Ok(row)
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn insert_template(&self, new: NewTemplate) -> Result<(Template, Vec<Question>)> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();

        let (lineage_id, version) = match new.lineage_id {
            Some(lineage_id) => {
                // The root row (id = lineage_id) is the lineage lock. MAX(version)
                // runs as its own statement so it sees revisions committed
                // while this transaction waited.
                sqlx::query_scalar::<_, Uuid>(
                    "SELECT id FROM assessment_templates WHERE id = $1 FOR UPDATE",
                )
                .bind(lineage_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| not_found("Template lineage", lineage_id))?;

                let latest: i32 = sqlx::query_scalar::<_, Option<i32>>(
                    "SELECT MAX(version) FROM assessment_templates WHERE lineage_id = $1",
                )
                .bind(lineage_id)
                .fetch_one(&mut *tx)
                .await?
                .ok_or_else(|| not_found("Template lineage", lineage_id))?;

                sqlx::query("UPDATE assessment_templates SET is_active = FALSE WHERE lineage_id = $1")
                    .bind(lineage_id)
                    .execute(&mut *tx)
                    .await?;
                (lineage_id, latest + 1)
            }
            None => (id, 1),
        };

        let template = sqlx::query_as::<_, TemplateRow>(&format!(
            r#"
            INSERT INTO assessment_templates (
                id, lineage_id, version, title, description, is_active,
                pass_score_threshold, time_limit_minutes
            ) VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .bind(lineage_id)
        .bind(version)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.pass_score_threshold)
        .bind(new.time_limit_minutes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "Template lineage {} was revised concurrently",
                lineage_id
            )),
            other => other.into(),
        })?;

        for (idx, q) in new.questions.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO assessment_questions (
                    id, template_id, question_text, question_type, options,
                    correct_answer, points, order_index
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(q.text)
            .bind(q.question_type.as_str())
            .bind(JsonValue::Array(q.options))
            .bind(q.correct_answer)
            .bind(q.points)
            .bind(idx as i32 + 1)
            .execute(&mut *tx)
            .await?;
        }

        let questions = Self::questions_in_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok((template.into(), questions))
    }

    async fn get_template(&self, id: Uuid) -> Result<Template> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM assessment_templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("Template", id))?;
        Ok(row.into())
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<Template>> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            r#"
            SELECT {} FROM assessment_templates
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY created_at DESC, version DESC
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Template::from).collect())
    }

    async fn set_template_active(&self, id: Uuid, is_active: bool) -> Result<Template> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "UPDATE assessment_templates SET is_active = $2 WHERE id = $1 RETURNING {}",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("Template", id))?;
        Ok(row.into())
    }

    async fn list_questions(&self, template_id: Uuid) -> Result<Vec<Question>> {
        // Fails with NotFound for unknown templates rather than returning [].
        self.get_template(template_id).await?;
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM assessment_questions WHERE template_id = $1 ORDER BY order_index, id",
            QUESTION_COLUMNS
        ))
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;
        into_questions(rows)
    }

    async fn reorder_questions(
        &self,
        template_id: Uuid,
        question_ids: Vec<Uuid>,
    ) -> Result<Vec<Question>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM assessment_templates WHERE id = $1 FOR UPDATE")
            .bind(template_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found("Template", template_id))?;

        let mut expected: Vec<Uuid> = Self::questions_in_tx(&mut tx, template_id)
            .await?
            .into_iter()
            .map(|q| q.id)
            .collect();
        let mut given = question_ids.clone();
        expected.sort();
        given.sort();
        if expected != given {
            return Err(Error::Validation(
                "questionIds must list every question of the template exactly once".to_string(),
            ));
        }

        // The (template_id, order_index) constraint is deferred to commit.
        for (idx, qid) in question_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE assessment_questions SET order_index = $1 WHERE id = $2 AND template_id = $3",
            )
            .bind(idx as i32 + 1)
            .bind(qid)
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        }

        let questions = Self::questions_in_tx(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(questions)
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt> {
        let result = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            INSERT INTO assessment_attempts (
                id, candidate_id, template_id, status, started_at, expires_at, max_score
            ) VALUES ($1, $2, $3, 'in_progress', $4, $5, $6)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(new.candidate_id)
        .bind(new.template_id)
        .bind(new.started_at)
        .bind(new.expires_at)
        .bind(new.max_score)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(Error::Conflict(
                "Candidate already has an attempt in progress for this template".to_string(),
            )),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(not_found("Template", new.template_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Attempt> {
        sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM assessment_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("Attempt", id))?
        .try_into()
    }

    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            SELECT {} FROM assessment_attempts
            WHERE ($1::uuid IS NULL OR candidate_id = $1)
              AND ($2::uuid IS NULL OR template_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY started_at DESC, id
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(filter.candidate_id)
        .bind(filter.template_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        into_attempts(rows)
    }

    async fn complete_attempt(&self, completion: AttemptCompletion) -> Result<Attempt> {
        let mut tx = self.pool.begin().await?;
        Self::lock_in_progress(&mut tx, completion.attempt_id).await?;

        for answer in completion.answers {
            sqlx::query(
                r#"
                INSERT INTO assessment_answers (
                    id, attempt_id, question_id, submitted_value, is_correct,
                    points_earned, needs_review, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(completion.attempt_id)
            .bind(answer.question_id)
            .bind(answer.submitted_value)
            .bind(answer.is_correct)
            .bind(answer.points_earned)
            .bind(answer.needs_review)
            .bind(completion.completed_at)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            UPDATE assessment_attempts
            SET status = 'completed', completed_at = $2, score = $3, passed = $4
            WHERE id = $1
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(completion.attempt_id)
        .bind(completion.completed_at)
        .bind(completion.score)
        .bind(completion.passed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn abandon_attempt(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attempt> {
        let mut tx = self.pool.begin().await?;
        Self::lock_in_progress(&mut tx, id).await?;

        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            UPDATE assessment_attempts
            SET status = 'abandoned', completed_at = $2
            WHERE id = $1
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn abandon_expired(&self, cutoff: DateTime<Utc>, at: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE assessment_attempts
            SET status = 'abandoned', completed_at = $2
            WHERE status = 'in_progress'
              AND expires_at IS NOT NULL
              AND expires_at <= $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .bind(at)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        self.get_attempt(attempt_id).await?;
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT ans.id, ans.attempt_id, ans.question_id, ans.submitted_value, ans.is_correct,
                   ans.points_earned, ans.needs_review, ans.created_at
            FROM assessment_answers ans
            JOIN assessment_questions q ON q.id = ans.question_id
            WHERE ans.attempt_id = $1
            ORDER BY q.order_index, q.id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }

    async fn answer_tallies(&self, template_id: Uuid) -> Result<Vec<AnswerTally>> {
        let tallies = sqlx::query_as::<_, AnswerTally>(
            r#"
            SELECT ans.question_id,
                   COUNT(ans.submitted_value) AS answered,
                   COUNT(*) FILTER (WHERE ans.is_correct) AS correct
            FROM assessment_answers ans
            JOIN assessment_attempts a ON a.id = ans.attempt_id
            WHERE a.template_id = $1 AND a.status = 'completed'
            GROUP BY ans.question_id
            "#,
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tallies)
    }
}
