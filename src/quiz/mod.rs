//! Quiz module - evaluation and submission
//!
//! Scoring is a pure function over the quiz's ordered question list and the
//! submitted answer map; the engine around it records the append-only
//! attempt row and drives lesson completion for lesson-attached quizzes.
//! Question payloads are stored as JSONB on the quiz row, one tagged answer
//! shape per question type.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::progress::recompute::percentage;
use crate::progress::types::CompletionProvenance;
use crate::progress::ProgressEngine;
use crate::shared::error::{LearnError, LearnResult};
use crate::shared::state::AppState;
use crate::store::LearnStore;

// ============================================================================
// DATABASE SCHEMA
// ============================================================================

diesel::table! {
    learn_quizzes (id) {
        id -> Uuid,
        course_id -> Uuid,
        lesson_id -> Nullable<Uuid>,
        title -> Text,
        pass_threshold -> Int4,
        time_limit_minutes -> Nullable<Int4>,
        max_attempts -> Int4,
        questions -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    learn_quiz_attempts (id) {
        id -> Uuid,
        user_id -> Uuid,
        quiz_id -> Uuid,
        answers -> Jsonb,
        score -> Int4,
        max_score -> Int4,
        percentage -> Int4,
        passed -> Bool,
        time_spent_seconds -> Int4,
        attempt_number -> Int4,
        completed_at -> Timestamptz,
    }
}

// ============================================================================
// DATA MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_quizzes)]
pub struct Quiz {
    pub id: Uuid,
    pub course_id: Uuid,
    pub lesson_id: Option<Uuid>,
    pub title: String,
    pub pass_threshold: i32,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub questions: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_PASS_THRESHOLD: i32 = 70;
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

impl Quiz {
    /// Decode the ordered question list from the JSONB column.
    pub fn question_list(&self) -> LearnResult<Vec<QuizQuestion>> {
        let mut questions: Vec<QuizQuestion> = serde_json::from_value(self.questions.clone())
            .map_err(|e| LearnError::Validation(format!("Malformed quiz questions: {}", e)))?;
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }
}

/// One attempt row. Append-only; retakes add rows, nothing is overwritten.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_quiz_attempts)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub answers: serde_json::Value,
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub time_spent_seconds: i32,
    pub attempt_number: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiSelect,
    TrueFalse,
    ShortAnswer,
}

/// A submitted or stored answer. The JSON shape decides the variant: an
/// option index, an index set, a boolean, or free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Selection(Vec<usize>),
    Choice(usize),
    Boolean(bool),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: AnswerValue,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    pub question_index: i32,
    pub question_id: Uuid,
    pub user_answer: Option<AnswerValue>,
    pub is_correct: bool,
    pub correct_answer: AnswerValue,
}

/// Output of the pure evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizEvaluation {
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub answers_breakdown: Vec<AnswerResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    pub user_id: Uuid,
    pub answers: HashMap<Uuid, AnswerValue>,
    #[serde(default)]
    pub seconds_remaining: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub attempt_id: Uuid,
    pub attempt_number: i32,
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub time_spent_seconds: i32,
    pub answers_breakdown: Vec<AnswerResult>,
}

/// Quiz summary safe to hand to a learner: question payloads (and their
/// correct answers) stay server-side.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub lesson_id: Option<Uuid>,
    pub title: String,
    pub pass_threshold: i32,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub questions_count: i32,
}

// ============================================================================
// EVALUATOR
// ============================================================================

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn answer_matches(question: &QuizQuestion, given: &AnswerValue) -> bool {
    match question.question_type {
        QuestionType::SingleChoice => matches!(
            (&question.correct_answer, given),
            (AnswerValue::Choice(want), AnswerValue::Choice(got)) if want == got
        ),
        QuestionType::TrueFalse => matches!(
            (&question.correct_answer, given),
            (AnswerValue::Boolean(want), AnswerValue::Boolean(got)) if want == got
        ),
        QuestionType::MultiSelect => match (&question.correct_answer, given) {
            (AnswerValue::Selection(want), AnswerValue::Selection(got)) => {
                let want: BTreeSet<usize> = want.iter().copied().collect();
                let got: BTreeSet<usize> = got.iter().copied().collect();
                want == got
            }
            _ => false,
        },
        QuestionType::ShortAnswer => match (&question.correct_answer, given) {
            (AnswerValue::Text(want), AnswerValue::Text(got)) => normalize(want) == normalize(got),
            _ => false,
        },
    }
}

/// Score a submission against an ordered question list. Pure: no store
/// access, no clock. An unanswered question scores incorrect; a quiz with
/// zero questions scores 0% and never passes.
pub fn evaluate(
    questions: &[QuizQuestion],
    answers: &HashMap<Uuid, AnswerValue>,
    pass_threshold: i32,
) -> QuizEvaluation {
    let max_score = questions.len() as i32;
    let mut score = 0;
    let mut answers_breakdown = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let user_answer = answers.get(&question.id);
        let is_correct = user_answer.is_some_and(|given| answer_matches(question, given));
        if is_correct {
            score += 1;
        }
        answers_breakdown.push(AnswerResult {
            question_index: index as i32,
            question_id: question.id,
            user_answer: user_answer.cloned(),
            is_correct,
            correct_answer: question.correct_answer.clone(),
        });
    }

    let pct = percentage(score as usize, max_score as usize);
    QuizEvaluation {
        score,
        max_score,
        percentage: pct,
        passed: max_score > 0 && pct >= pass_threshold,
        answers_breakdown,
    }
}

// ============================================================================
// QUIZ ENGINE
// ============================================================================

pub struct QuizEngine {
    store: Arc<dyn LearnStore>,
}

impl QuizEngine {
    pub fn new(store: Arc<dyn LearnStore>) -> Self {
        Self { store }
    }

    /// Score a submission and record the attempt. For a lesson-attached
    /// quiz the result then drives lesson completion with quiz provenance;
    /// a failed retake clears a previous pass. Quizzes embedded in slides
    /// carry their scores upward through the slide write instead.
    pub async fn submit_quiz(
        &self,
        quiz_id: Uuid,
        submission: QuizSubmission,
    ) -> LearnResult<QuizResult> {
        let quiz = self
            .store
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| LearnError::NotFound(format!("Quiz {} not found", quiz_id)))?;
        let questions = quiz.question_list()?;

        let evaluation = evaluate(&questions, &submission.answers, quiz.pass_threshold);
        let time_spent_seconds = match quiz.time_limit_minutes {
            Some(minutes) => (minutes * 60 - submission.seconds_remaining.unwrap_or(0)).max(0),
            None => 0,
        };

        let attempt_number =
            self.store.count_quiz_attempts(submission.user_id, quiz_id).await? as i32 + 1;

        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            user_id: submission.user_id,
            quiz_id,
            answers: serde_json::to_value(&submission.answers)?,
            score: evaluation.score,
            max_score: evaluation.max_score,
            percentage: evaluation.percentage,
            passed: evaluation.passed,
            time_spent_seconds,
            attempt_number,
            completed_at: Utc::now(),
        };
        let attempt = self.store.insert_quiz_attempt(attempt).await?;

        if let Some(lesson_id) = quiz.lesson_id {
            let provenance = CompletionProvenance::Quiz {
                quiz_id,
                attempt_id: attempt.id,
                percentage: evaluation.percentage,
                score: evaluation.score,
            };
            let progress = ProgressEngine::new(self.store.clone());
            if let Err(e) = progress
                .mark_lesson_complete(
                    submission.user_id,
                    lesson_id,
                    quiz.course_id,
                    evaluation.passed,
                    provenance,
                )
                .await
            {
                crate::progress::log_cascade(
                    &format!("lesson completion after quiz attempt {}", attempt.id),
                    e,
                );
            }
        }

        Ok(QuizResult {
            quiz_id,
            user_id: submission.user_id,
            attempt_id: attempt.id,
            attempt_number: attempt.attempt_number,
            score: evaluation.score,
            max_score: evaluation.max_score,
            percentage: evaluation.percentage,
            passed: evaluation.passed,
            time_spent_seconds,
            answers_breakdown: evaluation.answers_breakdown,
        })
    }
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// Get a quiz summary (question count only, no answer key)
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.get_quiz(quiz_id).await {
        Ok(Some(quiz)) => {
            let questions_count = quiz.question_list().map(|q| q.len() as i32).unwrap_or(0);
            Json(serde_json::json!({
                "success": true,
                "data": QuizResponse {
                    id: quiz.id,
                    course_id: quiz.course_id,
                    lesson_id: quiz.lesson_id,
                    title: quiz.title,
                    pass_threshold: quiz.pass_threshold,
                    time_limit_minutes: quiz.time_limit_minutes,
                    max_attempts: quiz.max_attempts,
                    questions_count,
                }
            }))
            .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": "Quiz not found"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Submit quiz answers
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<Uuid>,
    Json(submission): Json<QuizSubmission>,
) -> impl IntoResponse {
    let engine = QuizEngine::new(state.store.clone());

    match engine.submit_quiz(quiz_id, submission).await {
        Ok(result) => Json(serde_json::json!({
            "success": true,
            "data": result
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(question_type: QuestionType, correct: AnswerValue, order: i32) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            text: format!("question {}", order),
            question_type,
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            order_index: order,
        }
    }

    #[test]
    fn test_all_types_fully_correct() {
        let questions = vec![
            question(QuestionType::SingleChoice, AnswerValue::Choice(2), 0),
            question(QuestionType::MultiSelect, AnswerValue::Selection(vec![0, 2]), 1),
            question(QuestionType::TrueFalse, AnswerValue::Boolean(true), 2),
            question(QuestionType::ShortAnswer, AnswerValue::Text("Paris".into()), 3),
        ];
        let answers: HashMap<Uuid, AnswerValue> = [
            (questions[0].id, AnswerValue::Choice(2)),
            (questions[1].id, AnswerValue::Selection(vec![2, 0])),
            (questions[2].id, AnswerValue::Boolean(true)),
            (questions[3].id, AnswerValue::Text("  paris ".into())),
        ]
        .into();

        let result = evaluate(&questions, &answers, DEFAULT_PASS_THRESHOLD);
        assert_eq!(result.score, 4);
        assert_eq!(result.max_score, 4);
        assert_eq!(result.percentage, 100);
        assert!(result.passed);
        assert!(result.answers_breakdown.iter().all(|a| a.is_correct));
    }

    #[test]
    fn test_empty_submission_scores_zero() {
        let questions = vec![
            question(QuestionType::SingleChoice, AnswerValue::Choice(0), 0),
            question(QuestionType::TrueFalse, AnswerValue::Boolean(false), 1),
        ];
        let result = evaluate(&questions, &HashMap::new(), DEFAULT_PASS_THRESHOLD);
        assert_eq!(result.score, 0);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
        assert!(result.answers_breakdown.iter().all(|a| a.user_answer.is_none()));
    }

    #[test]
    fn test_multi_select_set_equality() {
        let q = question(QuestionType::MultiSelect, AnswerValue::Selection(vec![0, 2]), 0);

        assert!(answer_matches(&q, &AnswerValue::Selection(vec![2, 0])));
        assert!(!answer_matches(&q, &AnswerValue::Selection(vec![0, 2, 3])));
        assert!(!answer_matches(&q, &AnswerValue::Selection(vec![0])));
        // A bare index is not a selection.
        assert!(!answer_matches(&q, &AnswerValue::Choice(0)));
    }

    #[test]
    fn test_zero_question_quiz() {
        let result = evaluate(&[], &HashMap::new(), DEFAULT_PASS_THRESHOLD);
        assert_eq!(result.max_score, 0);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
        assert!(result.answers_breakdown.is_empty());
    }

    #[test]
    fn test_partial_score_against_threshold() {
        let questions = vec![
            question(QuestionType::SingleChoice, AnswerValue::Choice(1), 0),
            question(QuestionType::SingleChoice, AnswerValue::Choice(3), 1),
        ];
        let answers: HashMap<Uuid, AnswerValue> =
            [(questions[0].id, AnswerValue::Choice(1))].into();

        let result = evaluate(&questions, &answers, 70);
        assert_eq!(result.score, 1);
        assert_eq!(result.percentage, 50);
        assert!(!result.passed, "50 < 70 must not pass");
    }

    #[test]
    fn test_short_answer_no_fuzzy_match() {
        let q = question(QuestionType::ShortAnswer, AnswerValue::Text("oxidation".into()), 0);
        assert!(answer_matches(&q, &AnswerValue::Text("OXIDATION  ".into())));
        assert!(!answer_matches(&q, &AnswerValue::Text("oxidations".into())));
    }

    #[test]
    fn test_answer_value_shapes_from_json() {
        let json = serde_json::json!({
            "a": 2,
            "b": [0, 2],
            "c": true,
            "d": "text"
        });
        let map: HashMap<String, AnswerValue> = serde_json::from_value(json).unwrap();
        assert_eq!(map["a"], AnswerValue::Choice(2));
        assert_eq!(map["b"], AnswerValue::Selection(vec![0, 2]));
        assert_eq!(map["c"], AnswerValue::Boolean(true));
        assert_eq!(map["d"], AnswerValue::Text("text".into()));
    }

    #[test]
    fn test_question_list_is_ordered() {
        let q0 = question(QuestionType::TrueFalse, AnswerValue::Boolean(true), 0);
        let q1 = question(QuestionType::TrueFalse, AnswerValue::Boolean(false), 1);
        let quiz = Quiz {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            lesson_id: None,
            title: "t".into(),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            time_limit_minutes: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            questions: serde_json::to_value(vec![q1.clone(), q0.clone()]).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let list = quiz.question_list().unwrap();
        assert_eq!(list, vec![q0, q1]);
    }
}
