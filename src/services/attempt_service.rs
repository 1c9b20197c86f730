use crate::database::AssessmentStore;
use crate::dto::attempt_dto::{AttemptResultsResponse, QuestionReview, SubmitAttemptResponse};
use crate::error::{Error, Result};
use crate::models::attempt::{Attempt, AttemptCompletion, AttemptFilter, AttemptStatus, NewAttempt};
use crate::models::question;
use crate::services::grading_service::GradingService;
use crate::utils::time;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn AssessmentStore>,
    grace: Duration,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AssessmentStore>, submission_grace_seconds: i64) -> Self {
        Self {
            store,
            grace: Duration::seconds(submission_grace_seconds.max(0)),
        }
    }

    pub async fn start_attempt(&self, candidate_id: Uuid, template_id: Uuid) -> Result<Attempt> {
        let template = self.store.get_template(template_id).await?;
        if !template.is_active {
            return Err(Error::InvalidState(format!(
                "Template {} is not active",
                template_id
            )));
        }

        let questions = self.store.list_questions(template_id).await?;
        if questions.is_empty() {
            return Err(Error::Validation(format!(
                "Template {} has no questions",
                template_id
            )));
        }

        let now = time::now();
        self.release_overdue(candidate_id, template_id, now).await?;

        let attempt = self
            .store
            .insert_attempt(NewAttempt {
                candidate_id,
                template_id,
                started_at: now,
                expires_at: template
                    .time_limit_minutes
                    .map(|m| now + Duration::minutes(i64::from(m))),
                max_score: question::max_score(&questions),
            })
            .await?;

        tracing::info!(
            attempt_id = %attempt.id,
            candidate_id = %candidate_id,
            template_id = %template_id,
            "Attempt started"
        );
        Ok(attempt)
    }

    /// An in-progress attempt past its deadline would otherwise block a new
    /// start until the sweeper runs.
    async fn release_overdue(
        &self,
        candidate_id: Uuid,
        template_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let active = self
            .store
            .list_attempts(AttemptFilter {
                candidate_id: Some(candidate_id),
                template_id: Some(template_id),
                status: Some(AttemptStatus::InProgress),
            })
            .await?;

        for attempt in active.iter().filter(|a| a.is_overdue(now, self.grace)) {
            match self.store.abandon_attempt(attempt.id, now).await {
                Ok(_) => tracing::info!(attempt_id = %attempt.id, "Overdue attempt abandoned"),
                // Completed or swept concurrently.
                Err(Error::InvalidState(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        answers: HashMap<String, JsonValue>,
    ) -> Result<SubmitAttemptResponse> {
        let attempt = self.store.get_attempt(attempt_id).await?;
        if attempt.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "Attempt {} is already {}",
                attempt.id, attempt.status
            )));
        }

        let now = time::now();
        if attempt.is_overdue(now, self.grace) {
            // Lost races surface as InvalidState from the store as well.
            self.store.abandon_attempt(attempt.id, now).await?;
            tracing::warn!(attempt_id = %attempt.id, "Submission after deadline, attempt abandoned");
            return Err(Error::InvalidState(format!(
                "Attempt {} expired at {}",
                attempt.id,
                attempt
                    .expires_at
                    .map(time::to_rfc3339)
                    .unwrap_or_default()
            )));
        }

        let template = self.store.get_template(attempt.template_id).await?;
        let questions = self.store.list_questions(attempt.template_id).await?;
        let submitted = parse_answers(answers, &questions)?;

        let report = GradingService::grade(&questions, &submitted);
        let passed = GradingService::passed(report.total_score, template.pass_score_threshold);

        let updated = self
            .store
            .complete_attempt(AttemptCompletion {
                attempt_id: attempt.id,
                completed_at: now,
                score: report.total_score,
                passed,
                answers: report
                    .per_question
                    .iter()
                    .map(|g| g.to_new_answer())
                    .collect(),
            })
            .await?;

        tracing::info!(
            attempt_id = %updated.id,
            score = report.total_score,
            max_score = report.max_score,
            passed,
            "Attempt submitted"
        );

        Ok(SubmitAttemptResponse {
            attempt_id: updated.id,
            status: updated.status,
            score: report.total_score,
            max_score: report.max_score,
            passed,
            needs_review: report.needs_review(),
            per_question: report.per_question,
        })
    }

    pub async fn get_attempt(&self, attempt_id: Uuid) -> Result<Attempt> {
        self.store.get_attempt(attempt_id).await
    }

    pub async fn abandon_attempt(&self, attempt_id: Uuid) -> Result<Attempt> {
        let attempt = self.store.abandon_attempt(attempt_id, time::now()).await?;
        tracing::info!(attempt_id = %attempt_id, "Attempt abandoned");
        Ok(attempt)
    }

    pub async fn get_results(&self, attempt_id: Uuid) -> Result<AttemptResultsResponse> {
        let attempt = self.store.get_attempt(attempt_id).await?;
        if attempt.status != AttemptStatus::Completed {
            return Err(Error::InvalidState(format!(
                "Attempt {} is {}, results are available once completed",
                attempt.id, attempt.status
            )));
        }

        let questions = self.store.list_questions(attempt.template_id).await?;
        let answers: HashMap<Uuid, _> = self
            .store
            .list_answers(attempt.id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a))
            .collect();

        let questions = questions
            .into_iter()
            .map(|q| {
                let answer = answers.get(&q.id);
                QuestionReview {
                    question_id: q.id,
                    text: q.text,
                    question_type: q.question_type,
                    order_index: q.order_index,
                    submitted: answer.and_then(|a| a.submitted_value.clone()),
                    correct_answer: q.correct_answer,
                    is_correct: answer.and_then(|a| a.is_correct),
                    points_earned: answer.map_or(0, |a| a.points_earned),
                    max_points: q.points,
                    needs_review: answer.map_or(false, |a| a.needs_review),
                }
            })
            .collect();

        Ok(AttemptResultsResponse { attempt, questions })
    }

    /// Newest first, across all candidates unless the filter narrows it.
    pub async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>> {
        self.store.list_attempts(filter).await
    }

    pub async fn list_candidate_attempts(&self, candidate_id: Uuid) -> Result<Vec<Attempt>> {
        self.store
            .list_attempts(AttemptFilter {
                candidate_id: Some(candidate_id),
                ..Default::default()
            })
            .await
    }

    /// Abandons attempts whose deadline plus grace has passed.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let expired = self.store.abandon_expired(now - self.grace, now).await?;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired attempts abandoned");
        }
        Ok(expired)
    }
}

/// Keys must be ids of questions in the attempt's template; one unknown key
/// rejects the whole submission. Values are not checked here.
fn parse_answers(
    raw: HashMap<String, JsonValue>,
    questions: &[question::Question],
) -> Result<HashMap<Uuid, JsonValue>> {
    let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
    let mut parsed = HashMap::with_capacity(raw.len());

    for (key, value) in raw {
        let id = Uuid::parse_str(key.trim())
            .map_err(|_| Error::Validation(format!("Answer key '{}' is not a question id", key)))?;
        if !known.contains(&id) {
            return Err(Error::Validation(format!(
                "Question {} is not part of this assessment",
                id
            )));
        }
        parsed.insert(id, value);
    }
    Ok(parsed)
}
