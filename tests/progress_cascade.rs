//! End-to-end tests of the completion cascade over the in-memory store:
//! slide writes up through presentation, lesson and course aggregation to
//! certificate issuance, including duplicate triggers and regression.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use learnserver::catalog::{
    CertificateTemplate, ContentType, Course, Lesson, Presentation, Slide, User,
};
use learnserver::progress::types::{
    CompletionProvenance, RecordSlideProgressRequest, SlideMetadata,
};
use learnserver::progress::ProgressEngine;
use learnserver::quiz::{
    AnswerValue, QuestionType, Quiz, QuizEngine, QuizQuestion, QuizSubmission,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_PASS_THRESHOLD,
};
use learnserver::shared::error::LearnError;
use learnserver::store::{LearnStore, MemoryStore};

struct Fixture {
    store: Arc<MemoryStore>,
    user_id: Uuid,
    course_id: Uuid,
    lesson_ids: Vec<Uuid>,
}

fn two_questions() -> Vec<QuizQuestion> {
    vec![
        QuizQuestion {
            id: Uuid::new_v4(),
            text: "first".into(),
            question_type: QuestionType::SingleChoice,
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: AnswerValue::Choice(1),
            order_index: 0,
        },
        QuizQuestion {
            id: Uuid::new_v4(),
            text: "second".into(),
            question_type: QuestionType::TrueFalse,
            options: vec![],
            correct_answer: AnswerValue::Boolean(true),
            order_index: 1,
        },
    ]
}

fn seed_course(lesson_count: usize) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let user_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
    let now = Utc::now();

    store.put_user(User {
        id: user_id,
        full_name: "Grace Hopper".into(),
        email: "grace@example.com".into(),
        created_at: now,
    });
    store.put_course(Course {
        id: course_id,
        title: "Compilers".into(),
        description: None,
        instructor: Some("Prof. Backus".into()),
        organization: Some("Navy".into()),
        created_at: now,
        updated_at: now,
    });
    store.put_template(CertificateTemplate {
        id: Uuid::new_v4(),
        name: "classic".into(),
        is_default: true,
    });

    let lesson_ids: Vec<Uuid> = (0..lesson_count)
        .map(|i| {
            let id = Uuid::new_v4();
            store.put_lesson(Lesson {
                id,
                course_id,
                title: format!("Lesson {}", i + 1),
                lesson_order: i as i32,
            });
            id
        })
        .collect();

    Fixture {
        store,
        user_id,
        course_id,
        lesson_ids,
    }
}

/// Attach a two-slide presentation (text slide + embedded quiz slide) to
/// the given lesson. Returns (presentation_id, slide_ids, quiz_id).
fn seed_presentation(fix: &Fixture, lesson_id: Uuid) -> (Uuid, Vec<Uuid>, Uuid) {
    let presentation_id = Uuid::new_v4();
    let quiz_id = Uuid::new_v4();
    let now = Utc::now();

    fix.store.put_presentation(Presentation {
        id: presentation_id,
        lesson_id,
        title: "Intro deck".into(),
        estimated_duration_minutes: 10,
    });

    let slide_a = Uuid::new_v4();
    let slide_b = Uuid::new_v4();
    fix.store.put_slide(Slide {
        id: slide_a,
        presentation_id,
        slide_number: 1,
        content_type: ContentType::Text.to_string(),
        metadata: serde_json::json!({}),
    });
    fix.store.put_slide(Slide {
        id: slide_b,
        presentation_id,
        slide_number: 2,
        content_type: ContentType::Quiz.to_string(),
        metadata: serde_json::json!({ "quiz_id": quiz_id.to_string() }),
    });

    fix.store.put_quiz(Quiz {
        id: quiz_id,
        course_id: fix.course_id,
        lesson_id: None,
        title: "Checkpoint".into(),
        pass_threshold: DEFAULT_PASS_THRESHOLD,
        time_limit_minutes: None,
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        questions: serde_json::to_value(two_questions()).unwrap(),
        created_at: now,
        updated_at: now,
    });

    (presentation_id, vec![slide_a, slide_b], quiz_id)
}

fn slide_request(
    fix: &Fixture,
    lesson_id: Uuid,
    presentation_id: Uuid,
    slide_id: Uuid,
    time_spent_seconds: i32,
    metadata: SlideMetadata,
) -> RecordSlideProgressRequest {
    RecordSlideProgressRequest {
        user_id: fix.user_id,
        slide_id,
        presentation_id: Some(presentation_id),
        lesson_id: Some(lesson_id),
        course_id: Some(fix.course_id),
        time_spent_seconds,
        completed: true,
        metadata,
    }
}

#[tokio::test]
async fn missing_context_rejected_before_write() {
    let fix = seed_course(1);
    let (presentation_id, slides, _) = seed_presentation(&fix, fix.lesson_ids[0]);
    let engine = ProgressEngine::new(fix.store.clone());

    let mut req = slide_request(
        &fix,
        fix.lesson_ids[0],
        presentation_id,
        slides[0],
        5,
        SlideMetadata::default(),
    );
    req.lesson_id = None;

    let err = engine.record_slide_progress(req).await.unwrap_err();
    assert!(matches!(err, LearnError::MissingContext(_)));

    let rows = fix
        .store
        .slide_progress_for_presentation(fix.user_id, presentation_id)
        .await
        .unwrap();
    assert!(rows.is_empty(), "no partially-keyed row may be written");
}

#[tokio::test]
async fn certificate_issued_exactly_once_on_duplicate_trigger() {
    let fix = seed_course(3);
    let engine = ProgressEngine::new(fix.store.clone());

    for lesson_id in &fix.lesson_ids {
        engine
            .mark_lesson_complete(
                fix.user_id,
                *lesson_id,
                fix.course_id,
                true,
                CompletionProvenance::Manual { note: None },
            )
            .await
            .unwrap();
    }
    let first = fix
        .store
        .get_enrollment(fix.user_id, fix.course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.progress_percentage, 100);
    let first_completed_at = first.completed_at.unwrap();

    // Duplicate trigger: re-complete the last lesson.
    engine
        .mark_lesson_complete(
            fix.user_id,
            fix.lesson_ids[2],
            fix.course_id,
            true,
            CompletionProvenance::Manual { note: None },
        )
        .await
        .unwrap();

    let certificates = fix
        .store
        .certificates_for_user(fix.user_id)
        .await
        .unwrap();
    assert_eq!(certificates.len(), 1);

    let again = fix
        .store
        .get_enrollment(fix.user_id, fix.course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.progress_percentage, 100);
    assert_eq!(again.completed_at, Some(first_completed_at));
}

#[tokio::test]
async fn end_to_end_two_slide_course() {
    let fix = seed_course(1);
    let lesson_id = fix.lesson_ids[0];
    let (presentation_id, slides, quiz_id) = seed_presentation(&fix, lesson_id);
    let store: Arc<dyn LearnStore> = fix.store.clone();
    let engine = ProgressEngine::new(store.clone());

    // Slide A viewed and completed.
    engine
        .record_slide_progress(slide_request(
            &fix,
            lesson_id,
            presentation_id,
            slides[0],
            10,
            SlideMetadata {
                slide_order: Some(1),
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let halfway = store
        .get_presentation_progress(fix.user_id, presentation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(halfway.progress_percentage, 50);
    assert_eq!(halfway.total_time_spent_seconds, 10);
    assert!(!halfway.completed);
    assert_eq!(halfway.completed_at, None);

    // The embedded quiz is submitted with one of two correct.
    let questions = fix
        .store
        .get_quiz(quiz_id)
        .await
        .unwrap()
        .unwrap()
        .question_list()
        .unwrap();
    let answers: HashMap<Uuid, AnswerValue> = [
        (questions[0].id, AnswerValue::Choice(1)),
        (questions[1].id, AnswerValue::Boolean(false)),
    ]
    .into();
    let quiz_engine = QuizEngine::new(store.clone());
    let result = quiz_engine
        .submit_quiz(
            quiz_id,
            QuizSubmission {
                user_id: fix.user_id,
                answers,
                seconds_remaining: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(result.score, 1);
    assert_eq!(result.percentage, 50);
    assert!(!result.passed, "50 < 70");
    assert_eq!(result.attempt_number, 1);

    // Viewing the quiz slide completes it regardless of the failed attempt.
    let mut meta = SlideMetadata {
        slide_order: Some(2),
        ..Default::default()
    };
    meta.quiz_scores
        .insert(quiz_id.to_string(), result.percentage);
    engine
        .record_slide_progress(slide_request(
            &fix,
            lesson_id,
            presentation_id,
            slides[1],
            30,
            meta,
        ))
        .await
        .unwrap();

    let done = store
        .get_presentation_progress(fix.user_id, presentation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.progress_percentage, 100);
    assert!(done.completed);
    assert!(done.completed_at.is_some());
    assert_eq!(done.total_time_spent_seconds, 40);
    assert_eq!(
        done.metadata["quiz_scores"][quiz_id.to_string()],
        serde_json::json!(50)
    );

    let lesson_rows = store
        .lesson_progress_for_course(fix.user_id, fix.course_id)
        .await
        .unwrap();
    assert_eq!(lesson_rows.len(), 1);
    assert!(lesson_rows[0].completed);
    assert_eq!(lesson_rows[0].metadata["completed_via"], "presentation");

    let enrollment = store
        .get_enrollment(fix.user_id, fix.course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress_percentage, 100);
    assert_eq!(enrollment.status, "completed");
    assert!(enrollment.completed_at.is_some());

    let certificates = store.certificates_for_user(fix.user_id).await.unwrap();
    assert_eq!(certificates.len(), 1);
    assert_eq!(
        certificates[0].certificate_data["course_title"],
        serde_json::json!("Compilers")
    );
    assert_eq!(
        certificates[0].certificate_data["learner_name"],
        serde_json::json!("Grace Hopper")
    );
}

#[tokio::test]
async fn uncompletion_regresses_enrollment_but_keeps_certificate() {
    let fix = seed_course(1);
    let lesson_id = fix.lesson_ids[0];
    let engine = ProgressEngine::new(fix.store.clone());

    engine
        .mark_lesson_complete(
            fix.user_id,
            lesson_id,
            fix.course_id,
            true,
            CompletionProvenance::Manual { note: None },
        )
        .await
        .unwrap();
    assert_eq!(
        fix.store
            .certificates_for_user(fix.user_id)
            .await
            .unwrap()
            .len(),
        1
    );

    engine
        .mark_lesson_complete(
            fix.user_id,
            lesson_id,
            fix.course_id,
            false,
            CompletionProvenance::Manual {
                note: Some("retake required".into()),
            },
        )
        .await
        .unwrap();

    let enrollment = fix
        .store
        .get_enrollment(fix.user_id, fix.course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress_percentage, 0);
    assert_eq!(enrollment.completed_at, None);
    assert_eq!(enrollment.status, "not_started");

    // The certificate has no deletion path.
    assert_eq!(
        fix.store
            .certificates_for_user(fix.user_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn presentation_recompute_is_idempotent() {
    let fix = seed_course(1);
    let lesson_id = fix.lesson_ids[0];
    let (presentation_id, slides, _) = seed_presentation(&fix, lesson_id);
    let engine = ProgressEngine::new(fix.store.clone());

    engine
        .record_slide_progress(slide_request(
            &fix,
            lesson_id,
            presentation_id,
            slides[0],
            10,
            SlideMetadata::default(),
        ))
        .await
        .unwrap();

    let first = engine
        .recompute_presentation_progress(fix.user_id, presentation_id, lesson_id, fix.course_id)
        .await
        .unwrap();
    let second = engine
        .recompute_presentation_progress(fix.user_id, presentation_id, lesson_id, fix.course_id)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_quiz_retake_clears_lesson_pass() {
    let fix = seed_course(1);
    let lesson_id = fix.lesson_ids[0];
    let now = Utc::now();
    let quiz_id = Uuid::new_v4();
    fix.store.put_quiz(Quiz {
        id: quiz_id,
        course_id: fix.course_id,
        lesson_id: Some(lesson_id),
        title: "Final".into(),
        pass_threshold: DEFAULT_PASS_THRESHOLD,
        time_limit_minutes: Some(10),
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        questions: serde_json::to_value(two_questions()).unwrap(),
        created_at: now,
        updated_at: now,
    });
    let store: Arc<dyn LearnStore> = fix.store.clone();
    let quiz_engine = QuizEngine::new(store.clone());

    let questions = fix
        .store
        .get_quiz(quiz_id)
        .await
        .unwrap()
        .unwrap()
        .question_list()
        .unwrap();

    // Passing attempt completes the lesson and the one-lesson course.
    let all_correct: HashMap<Uuid, AnswerValue> = [
        (questions[0].id, AnswerValue::Choice(1)),
        (questions[1].id, AnswerValue::Boolean(true)),
    ]
    .into();
    let pass = quiz_engine
        .submit_quiz(
            quiz_id,
            QuizSubmission {
                user_id: fix.user_id,
                answers: all_correct,
                seconds_remaining: Some(300),
            },
        )
        .await
        .unwrap();
    assert!(pass.passed);
    assert_eq!(pass.time_spent_seconds, 300);

    let enrollment = store
        .get_enrollment(fix.user_id, fix.course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress_percentage, 100);
    assert_eq!(store.certificates_for_user(fix.user_id).await.unwrap().len(), 1);

    // Failed retake clears the pass; the certificate survives.
    let retake = quiz_engine
        .submit_quiz(
            quiz_id,
            QuizSubmission {
                user_id: fix.user_id,
                answers: HashMap::new(),
                seconds_remaining: None,
            },
        )
        .await
        .unwrap();
    assert!(!retake.passed);
    assert_eq!(retake.attempt_number, 2);

    let lesson_rows = store
        .lesson_progress_for_course(fix.user_id, fix.course_id)
        .await
        .unwrap();
    assert!(!lesson_rows[0].completed);
    assert_eq!(lesson_rows[0].metadata["completed_via"], "quiz");

    let enrollment = store
        .get_enrollment(fix.user_id, fix.course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress_percentage, 0);
    assert_eq!(enrollment.completed_at, None);
    assert_eq!(store.certificates_for_user(fix.user_id).await.unwrap().len(), 1);
}
