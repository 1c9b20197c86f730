use crate::models::answer::NewAnswer;
use crate::models::question::{Question, QuestionType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGrade {
    pub question_id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub submitted: Option<JsonValue>,
    pub is_correct: Option<bool>,
    pub points_earned: i32,
    pub max_points: i32,
    pub needs_review: bool,
}

impl QuestionGrade {
    pub fn to_new_answer(&self) -> NewAnswer {
        NewAnswer {
            question_id: self.question_id,
            submitted_value: self.submitted.clone(),
            is_correct: self.is_correct,
            points_earned: self.points_earned,
            needs_review: self.needs_review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub per_question: Vec<QuestionGrade>,
    pub total_score: i32,
    pub max_score: i32,
}

impl GradeReport {
    pub fn needs_review(&self) -> bool {
        self.per_question.iter().any(|g| g.needs_review)
    }
}

pub struct GradingService;

impl GradingService {
    /// Grades every question in the order given. Answers keyed by ids that
    /// are not in `questions` are ignored here; rejecting them is the
    /// caller's job.
    pub fn grade(questions: &[Question], submitted: &HashMap<Uuid, JsonValue>) -> GradeReport {
        let mut total_score = 0;
        let mut max_score = 0;
        let mut per_question = Vec::with_capacity(questions.len());

        for q in questions {
            let answer = submitted.get(&q.id).filter(|v| !v.is_null());
            let grade = grade_question(q, answer);
            total_score = i32::saturating_add(total_score, grade.points_earned);
            max_score = i32::saturating_add(max_score, grade.max_points);
            per_question.push(grade);
        }

        GradeReport {
            per_question,
            total_score,
            max_score,
        }
    }

    pub fn passed(score: i32, threshold: i32) -> bool {
        score >= threshold
    }
}

fn grade_question(q: &Question, answer: Option<&JsonValue>) -> QuestionGrade {
    let is_correct = match q.question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => {
            Some(matches!((answer, &q.correct_answer), (Some(given), Some(key)) if given == key))
        }
        QuestionType::MultipleChoice => {
            let given = answer.and_then(as_set);
            let key = q.correct_answer.as_ref().and_then(as_set);
            Some(matches!((given, key), (Some(g), Some(k)) if g == k))
        }
        QuestionType::FreeText => None,
    };

    QuestionGrade {
        question_id: q.id,
        question_type: q.question_type,
        submitted: answer.cloned(),
        is_correct,
        points_earned: if is_correct == Some(true) { q.points } else { 0 },
        max_points: q.points,
        needs_review: !q.question_type.is_auto_graded() && answer.is_some(),
    }
}

/// Array members as a set of canonical JSON strings, so `"1"` and `1` stay
/// distinct. `None` for anything that is not an array.
fn as_set(value: &JsonValue) -> Option<BTreeSet<String>> {
    value
        .as_array()
        .map(|items| items.iter().map(|v| v.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn q(id: u128, ty: QuestionType, key: Option<JsonValue>, points: i32) -> Question {
        Question {
            id: Uuid::from_u128(id),
            template_id: Uuid::nil(),
            text: format!("question {}", id),
            question_type: ty,
            options: vec![json!("A"), json!("B"), json!("C")],
            correct_answer: key,
            points,
            order_index: id as i32,
        }
    }

    fn answers(pairs: &[(u128, JsonValue)]) -> HashMap<Uuid, JsonValue> {
        pairs
            .iter()
            .map(|(id, v)| (Uuid::from_u128(*id), v.clone()))
            .collect()
    }

    #[test]
    fn single_choice_requires_exact_typed_match() {
        let questions = vec![
            q(1, QuestionType::SingleChoice, Some(json!("A")), 5),
            q(2, QuestionType::SingleChoice, Some(json!(2)), 5),
            q(3, QuestionType::SingleChoice, Some(json!(2)), 5),
        ];
        let report = GradingService::grade(
            &questions,
            &answers(&[(1, json!("A")), (2, json!("2")), (3, json!(2))]),
        );

        let earned: Vec<i32> = report.per_question.iter().map(|g| g.points_earned).collect();
        assert_eq!(earned, vec![5, 0, 5]);
        assert_eq!(report.per_question[1].is_correct, Some(false));
    }

    #[test]
    fn multiple_choice_is_order_independent_and_all_or_nothing() {
        let key = Some(json!(["B", "A"]));
        let questions = vec![
            q(1, QuestionType::MultipleChoice, key.clone(), 10),
            q(2, QuestionType::MultipleChoice, key.clone(), 10),
            q(3, QuestionType::MultipleChoice, key.clone(), 10),
            q(4, QuestionType::MultipleChoice, key, 10),
        ];
        let report = GradingService::grade(
            &questions,
            &answers(&[
                (1, json!(["A", "B"])),
                (2, json!(["A"])),
                (3, json!(["A", "B", "A"])),
                (4, json!("A")),
            ]),
        );

        let earned: Vec<i32> = report.per_question.iter().map(|g| g.points_earned).collect();
        assert_eq!(earned, vec![10, 0, 10, 0]);
        assert_eq!(report.total_score, 20);
    }

    #[test]
    fn free_text_scores_zero_and_is_flagged() {
        let questions = vec![
            q(1, QuestionType::FreeText, None, 4),
            q(2, QuestionType::FreeText, None, 4),
        ];
        let report = GradingService::grade(&questions, &answers(&[(1, json!("my essay"))]));

        assert_eq!(report.per_question[0].is_correct, None);
        assert!(report.per_question[0].needs_review);
        assert!(!report.per_question[1].needs_review);
        assert_eq!(report.total_score, 0);
        assert!(report.needs_review());
    }

    #[test]
    fn unanswered_questions_are_recorded_not_dropped() {
        let questions = vec![
            q(1, QuestionType::SingleChoice, Some(json!("A")), 3),
            q(2, QuestionType::TrueFalse, Some(json!(true)), 2),
            q(3, QuestionType::MultipleChoice, Some(json!(["A"])), 1),
        ];
        let report = GradingService::grade(&questions, &answers(&[(2, json!(null))]));

        assert_eq!(report.per_question.len(), 3);
        for grade in &report.per_question {
            assert_eq!(grade.submitted, None);
            assert_eq!(grade.points_earned, 0);
            assert_eq!(grade.is_correct, Some(false));
        }
        assert_eq!(report.max_score, 6);
    }

    #[test]
    fn max_score_is_the_sum_of_question_points() {
        let questions = vec![
            q(1, QuestionType::SingleChoice, Some(json!("A")), 3),
            q(2, QuestionType::FreeText, None, 7),
            q(3, QuestionType::TrueFalse, Some(json!(false)), 0),
        ];
        let report = GradingService::grade(&questions, &answers(&[(1, json!("A"))]));

        let per_question_max: i32 = report.per_question.iter().map(|g| g.max_points).sum();
        assert_eq!(per_question_max, report.max_score);
        assert_eq!(report.max_score, 10);
        assert_eq!(report.total_score, 3);
    }

    #[test]
    fn unknown_answer_ids_do_not_affect_the_report() {
        let questions = vec![q(1, QuestionType::SingleChoice, Some(json!("A")), 3)];
        let report =
            GradingService::grade(&questions, &answers(&[(1, json!("A")), (99, json!("A"))]));
        assert_eq!(report.per_question.len(), 1);
        assert_eq!(report.total_score, 3);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(GradingService::passed(7, 7));
        assert!(GradingService::passed(8, 7));
        assert!(!GradingService::passed(6, 7));
        assert!(GradingService::passed(0, 0));
    }

    #[test]
    fn grading_is_repeatable() {
        let questions = vec![
            q(1, QuestionType::MultipleChoice, Some(json!(["A", "C"])), 4),
            q(2, QuestionType::SingleChoice, Some(json!("B")), 1),
        ];
        let submitted = answers(&[(1, json!(["C", "A"])), (2, json!("A"))]);
        assert_eq!(
            GradingService::grade(&questions, &submitted),
            GradingService::grade(&questions, &submitted)
        );
    }
}
