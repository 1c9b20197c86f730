use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AssessmentStore;
use crate::error::{Error, Result};
use crate::models::answer::{Answer, AnswerTally};
use crate::models::attempt::{
    Attempt, AttemptCompletion, AttemptFilter, AttemptStatus, NewAttempt,
};
use crate::models::question::{sort_questions, Question};
use crate::models::template::{NewTemplate, Template};

#[derive(Default)]
struct State {
    templates: HashMap<Uuid, Template>,
    questions: HashMap<Uuid, Question>,
    attempts: HashMap<Uuid, Attempt>,
    answers: HashMap<Uuid, Vec<Answer>>,
}

impl State {
    fn template(&self, id: Uuid) -> Result<&Template> {
        self.templates
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Template {} not found", id)))
    }

    fn attempt_mut(&mut self, id: Uuid) -> Result<&mut Attempt> {
        self.attempts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", id)))
    }

    fn questions_of(&self, template_id: Uuid) -> Vec<Question> {
        let mut qs: Vec<Question> = self
            .questions
            .values()
            .filter(|q| q.template_id == template_id)
            .cloned()
            .collect();
        sort_questions(&mut qs);
        qs
    }
}

/// In-process store. Every mutation runs under one write lock, which gives
/// the same all-or-nothing behaviour as a database transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn insert_template(&self, new: NewTemplate) -> Result<(Template, Vec<Question>)> {
        let mut state = self.state.write().await;
        let id = Uuid::new_v4();

        let (lineage_id, version) = match new.lineage_id {
            Some(lineage_id) => {
                let latest = state
                    .templates
                    .values()
                    .filter(|t| t.lineage_id == lineage_id)
                    .map(|t| t.version)
                    .max()
                    .ok_or_else(|| {
                        Error::NotFound(format!("Template lineage {} not found", lineage_id))
                    })?;
                for t in state.templates.values_mut() {
                    if t.lineage_id == lineage_id {
                        t.is_active = false;
                    }
                }
                (lineage_id, latest + 1)
            }
            None => (id, 1),
        };

        let template = Template {
            id,
            lineage_id,
            version,
            title: new.title,
            description: new.description,
            is_active: true,
            pass_score_threshold: new.pass_score_threshold,
            time_limit_minutes: new.time_limit_minutes,
            created_at: Utc::now(),
        };

        let questions: Vec<Question> = new
            .questions
            .into_iter()
            .enumerate()
            .map(|(idx, q)| Question {
                id: Uuid::new_v4(),
                template_id: id,
                text: q.text,
                question_type: q.question_type,
                options: q.options,
                correct_answer: q.correct_answer,
                points: q.points,
                order_index: idx as i32 + 1,
            })
            .collect();

        state.templates.insert(id, template.clone());
        for q in &questions {
            state.questions.insert(q.id, q.clone());
        }
        Ok((template, questions))
    }

    async fn get_template(&self, id: Uuid) -> Result<Template> {
        let state = self.state.read().await;
        state.template(id).cloned()
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<Template>> {
        let state = self.state.read().await;
        let mut templates: Vec<Template> = state
            .templates
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.version.cmp(&a.version)));
        Ok(templates)
    }

    async fn set_template_active(&self, id: Uuid, is_active: bool) -> Result<Template> {
        let mut state = self.state.write().await;
        let template = state
            .templates
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Template {} not found", id)))?;
        template.is_active = is_active;
        Ok(template.clone())
    }

    async fn list_questions(&self, template_id: Uuid) -> Result<Vec<Question>> {
        let state = self.state.read().await;
        state.template(template_id)?;
        Ok(state.questions_of(template_id))
    }

    async fn reorder_questions(
        &self,
        template_id: Uuid,
        question_ids: Vec<Uuid>,
    ) -> Result<Vec<Question>> {
        let mut state = self.state.write().await;
        state.template(template_id)?;

        let current = state.questions_of(template_id);
        let mut expected: Vec<Uuid> = current.iter().map(|q| q.id).collect();
        let mut given = question_ids.clone();
        expected.sort();
        given.sort();
        if expected != given {
            return Err(Error::Validation(
                "questionIds must list every question of the template exactly once".to_string(),
            ));
        }

        for (idx, qid) in question_ids.iter().enumerate() {
            if let Some(q) = state.questions.get_mut(qid) {
                q.order_index = idx as i32 + 1;
            }
        }
        Ok(state.questions_of(template_id))
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt> {
        let mut state = self.state.write().await;
        state.template(new.template_id)?;

        if let Some(active) = state.attempts.values().find(|a| {
            a.candidate_id == new.candidate_id
                && a.template_id == new.template_id
                && a.status == AttemptStatus::InProgress
        }) {
            return Err(Error::Conflict(format!(
                "Candidate already has attempt {} in progress for this template",
                active.id
            )));
        }

        let attempt = Attempt {
            id: Uuid::new_v4(),
            candidate_id: new.candidate_id,
            template_id: new.template_id,
            status: AttemptStatus::InProgress,
            started_at: new.started_at,
            expires_at: new.expires_at,
            completed_at: None,
            score: None,
            max_score: new.max_score,
            passed: None,
        };
        state.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Attempt> {
        let state = self.state.read().await;
        state
            .attempts
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", id)))
    }

    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>> {
        let state = self.state.read().await;
        let mut attempts: Vec<Attempt> = state
            .attempts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(a.id.cmp(&b.id)));
        Ok(attempts)
    }

    async fn complete_attempt(&self, completion: AttemptCompletion) -> Result<Attempt> {
        let mut state = self.state.write().await;
        let attempt = state.attempt_mut(completion.attempt_id)?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(Error::InvalidState(format!(
                "Attempt {} is {}",
                attempt.id, attempt.status
            )));
        }

        attempt.status = AttemptStatus::Completed;
        attempt.completed_at = Some(completion.completed_at);
        attempt.score = Some(completion.score);
        attempt.passed = Some(completion.passed);
        let updated = attempt.clone();

        let answers = completion
            .answers
            .into_iter()
            .map(|a| Answer {
                id: Uuid::new_v4(),
                attempt_id: updated.id,
                question_id: a.question_id,
                submitted_value: a.submitted_value,
                is_correct: a.is_correct,
                points_earned: a.points_earned,
                needs_review: a.needs_review,
                created_at: completion.completed_at,
            })
            .collect();
        state.answers.insert(updated.id, answers);
        Ok(updated)
    }

    async fn abandon_attempt(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attempt> {
        let mut state = self.state.write().await;
        let attempt = state.attempt_mut(id)?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(Error::InvalidState(format!(
                "Attempt {} is {}",
                attempt.id, attempt.status
            )));
        }
        attempt.status = AttemptStatus::Abandoned;
        attempt.completed_at = Some(at);
        Ok(attempt.clone())
    }

    async fn abandon_expired(&self, cutoff: DateTime<Utc>, at: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut state = self.state.write().await;
        let mut expired = Vec::new();
        for attempt in state.attempts.values_mut() {
            let overdue = attempt.expires_at.map_or(false, |deadline| deadline <= cutoff);
            if attempt.status == AttemptStatus::InProgress && overdue {
                attempt.status = AttemptStatus::Abandoned;
                attempt.completed_at = Some(at);
                expired.push(attempt.id);
            }
        }
        Ok(expired)
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let state = self.state.read().await;
        if !state.attempts.contains_key(&attempt_id) {
            return Err(Error::NotFound(format!("Attempt {} not found", attempt_id)));
        }
        Ok(state.answers.get(&attempt_id).cloned().unwrap_or_default())
    }

    async fn answer_tallies(&self, template_id: Uuid) -> Result<Vec<AnswerTally>> {
        let state = self.state.read().await;
        let mut tallies: HashMap<Uuid, AnswerTally> = HashMap::new();
        let completed = state.attempts.values().filter(|a| {
            a.template_id == template_id && a.status == AttemptStatus::Completed
        });
        for attempt in completed {
            for answer in state.answers.get(&attempt.id).into_iter().flatten() {
                let tally = tallies.entry(answer.question_id).or_insert(AnswerTally {
                    question_id: answer.question_id,
                    ..Default::default()
                });
                if answer.submitted_value.is_some() {
                    tally.answered += 1;
                }
                if answer.is_correct == Some(true) {
                    tally.correct += 1;
                }
            }
        }
        Ok(tallies.into_values().collect())
    }
}
