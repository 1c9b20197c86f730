use crate::database::AssessmentStore;
use crate::dto::template_dto::{CreateQuestion, CreateTemplatePayload};
use crate::error::{Error, Result};
use crate::models::question::{self, NewQuestion, Question, QuestionType};
use crate::models::template::{NewTemplate, Template, TemplateDetail};
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct TemplateService {
    store: Arc<dyn AssessmentStore>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    pub async fn create_template(&self, payload: CreateTemplatePayload) -> Result<TemplateDetail> {
        let new = build_new_template(payload, None)?;
        let (template, questions) = self.store.insert_template(new).await?;
        tracing::info!(
            template_id = %template.id,
            questions = questions.len(),
            "Assessment template created"
        );
        Ok(detail(template, questions))
    }

    /// Publishes a new version of the template's lineage. Attempts already
    /// started keep pointing at the version they were started on.
    pub async fn revise_template(
        &self,
        template_id: Uuid,
        payload: CreateTemplatePayload,
    ) -> Result<TemplateDetail> {
        let current = self.store.get_template(template_id).await?;
        let new = build_new_template(payload, Some(current.lineage_id))?;
        let (template, questions) = self.store.insert_template(new).await?;
        tracing::info!(
            lineage_id = %template.lineage_id,
            from = %current.id,
            to = %template.id,
            version = template.version,
            "Assessment template revised"
        );
        Ok(detail(template, questions))
    }

    pub async fn get_template_detail(&self, template_id: Uuid) -> Result<TemplateDetail> {
        let template = self.store.get_template(template_id).await?;
        let questions = self.store.list_questions(template_id).await?;
        Ok(detail(template, questions))
    }

    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<Template>> {
        self.store.list_templates(active_only).await
    }

    pub async fn list_questions(&self, template_id: Uuid) -> Result<Vec<Question>> {
        self.store.list_questions(template_id).await
    }

    pub async fn reorder_questions(
        &self,
        template_id: Uuid,
        question_ids: Vec<Uuid>,
    ) -> Result<Vec<Question>> {
        let unique: HashSet<&Uuid> = question_ids.iter().collect();
        if unique.len() != question_ids.len() {
            return Err(Error::Validation(
                "questionIds must not contain duplicates".to_string(),
            ));
        }
        let questions = self
            .store
            .reorder_questions(template_id, question_ids)
            .await?;
        tracing::info!(template_id = %template_id, "Question order rewritten");
        Ok(questions)
    }

    pub async fn set_active(&self, template_id: Uuid, is_active: bool) -> Result<Template> {
        let template = self.store.set_template_active(template_id, is_active).await?;
        tracing::info!(template_id = %template_id, is_active, "Template activation changed");
        Ok(template)
    }
}

fn detail(template: Template, mut questions: Vec<Question>) -> TemplateDetail {
    question::sort_questions(&mut questions);
    TemplateDetail {
        max_score: question::max_score(&questions),
        template,
        questions,
    }
}

fn build_new_template(
    payload: CreateTemplatePayload,
    lineage_id: Option<Uuid>,
) -> Result<NewTemplate> {
    payload.validate()?;
    if payload.title.trim().is_empty() {
        return Err(Error::Validation("Title must not be empty".to_string()));
    }

    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(idx, q)| build_new_question(idx + 1, q))
        .collect::<Result<Vec<_>>>()?;

    let total: i64 = questions.iter().map(|q| i64::from(q.points)).sum();
    if total > i64::from(i32::MAX) {
        return Err(Error::Validation(format!(
            "Total points {} exceed the supported maximum",
            total
        )));
    }

    Ok(NewTemplate {
        lineage_id,
        title: payload.title.trim().to_string(),
        description: payload.description.filter(|d| !d.trim().is_empty()),
        pass_score_threshold: payload.pass_score_threshold,
        time_limit_minutes: payload.time_limit_minutes,
        questions,
    })
}

fn build_new_question(position: usize, q: CreateQuestion) -> Result<NewQuestion> {
    q.validate()?;
    let invalid = |msg: &str| Error::Validation(format!("Question {}: {}", position, msg));

    if q.text.trim().is_empty() {
        return Err(invalid("text must not be empty"));
    }
    if !(0..=question::MAX_QUESTION_POINTS).contains(&q.points) {
        return Err(invalid("points out of range"));
    }

    let key = q.correct_answer.filter(|v| !v.is_null());
    let options = match q.question_type {
        QuestionType::SingleChoice => {
            check_options(&q.options).map_err(|m| invalid(&m))?;
            match &key {
                Some(k) if !k.is_array() && q.options.contains(k) => {}
                _ => return Err(invalid("correctAnswer must be one of the options")),
            }
            q.options
        }
        QuestionType::MultipleChoice => {
            check_options(&q.options).map_err(|m| invalid(&m))?;
            match key.as_ref().and_then(JsonValue::as_array) {
                Some(items) if !items.is_empty() && items.iter().all(|i| q.options.contains(i)) => {}
                _ => {
                    return Err(invalid(
                        "correctAnswer must be a non-empty array of options",
                    ))
                }
            }
            q.options
        }
        QuestionType::TrueFalse => {
            if !matches!(key, Some(JsonValue::Bool(_))) {
                return Err(invalid("correctAnswer must be true or false"));
            }
            vec![json!(true), json!(false)]
        }
        QuestionType::FreeText => {
            if key.is_some() {
                return Err(invalid("free-text questions have no correctAnswer"));
            }
            if !q.options.is_empty() {
                return Err(invalid("free-text questions have no options"));
            }
            Vec::new()
        }
    };

    Ok(NewQuestion {
        text: q.text.trim().to_string(),
        question_type: q.question_type,
        options,
        correct_answer: key,
        points: q.points,
    })
}

fn check_options(options: &[JsonValue]) -> std::result::Result<(), String> {
    if options.len() < 2 {
        return Err("choice questions need at least two options".to_string());
    }
    let distinct: HashSet<String> = options.iter().map(|o| o.to_string()).collect();
    if distinct.len() != options.len() {
        return Err("options must be distinct".to_string());
    }
    Ok(())
}
