use crate::database::AssessmentStore;
use crate::dto::analytics_dto::{QuestionDifficulty, TemplateAnalytics};
use crate::error::Result;
use crate::models::answer::AnswerTally;
use crate::models::attempt::{AttemptFilter, AttemptStatus};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn AssessmentStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    pub async fn template_analytics(&self, template_id: Uuid) -> Result<TemplateAnalytics> {
        let questions = self.store.list_questions(template_id).await?;
        let attempts = self
            .store
            .list_attempts(AttemptFilter {
                template_id: Some(template_id),
                ..Default::default()
            })
            .await?;

        let count = |status: AttemptStatus| attempts.iter().filter(|a| a.status == status).count() as i64;
        let completed: Vec<_> = attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Completed)
            .collect();

        let score_sum: i64 = completed
            .iter()
            .map(|a| i64::from(a.score.unwrap_or(0)))
            .sum();
        let passed = completed.iter().filter(|a| a.passed == Some(true)).count() as i64;

        let mut tallies: HashMap<Uuid, AnswerTally> = self
            .store
            .answer_tallies(template_id)
            .await?
            .into_iter()
            .map(|t| (t.question_id, t))
            .collect();

        let total = completed.len() as i64;
        let questions = questions
            .iter()
            .map(|q| {
                let tally = tallies.remove(&q.id).unwrap_or_default();
                QuestionDifficulty {
                    question_id: q.id,
                    order_index: q.order_index,
                    answered: tally.answered,
                    correct: tally.correct,
                    correct_rate: if q.question_type.is_auto_graded() {
                        percent(tally.correct, total)
                    } else {
                        None
                    },
                }
            })
            .collect();

        Ok(TemplateAnalytics {
            template_id,
            attempts_started: attempts.len() as i64,
            in_progress: count(AttemptStatus::InProgress),
            completed: total,
            abandoned: count(AttemptStatus::Abandoned),
            average_score: ratio(score_sum, total),
            pass_rate: percent(passed, total),
            questions,
        })
    }
}

fn ratio(numerator: i64, denominator: i64) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    Some((Decimal::from(numerator) / Decimal::from(denominator)).round_dp(2))
}

fn percent(numerator: i64, denominator: i64) -> Option<Decimal> {
    ratio(numerator * 100, denominator)
}
