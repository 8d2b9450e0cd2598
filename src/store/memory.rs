//! In-memory store.
//!
//! Mirrors the upsert semantics of the Postgres store over plain hash maps.
//! Used by the integration tests and as the fallback backend when no
//! `DATABASE_URL` is configured (local development). All state is lost on
//! shutdown.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::catalog::{CertificateTemplate, Course, Lesson, Presentation, Slide, User};
use crate::certificate::Certificate;
use crate::progress::types::{Enrollment, LessonProgress, PresentationProgress, SlideProgress};
use crate::quiz::{Quiz, QuizAttempt};
use crate::shared::error::LearnResult;

use super::LearnStore;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    courses: HashMap<Uuid, Course>,
    lessons: Vec<Lesson>,
    presentations: HashMap<Uuid, Presentation>,
    slides: Vec<Slide>,
    templates: Vec<CertificateTemplate>,
    quizzes: HashMap<Uuid, Quiz>,
    quiz_attempts: Vec<QuizAttempt>,
    slide_progress: HashMap<(Uuid, Uuid), SlideProgress>,
    presentation_progress: HashMap<(Uuid, Uuid), PresentationProgress>,
    lesson_progress: HashMap<(Uuid, Uuid, Uuid), LessonProgress>,
    enrollments: HashMap<(Uuid, Uuid), Enrollment>,
    certificates: Vec<Certificate>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Fixture seeding; authoring flows are out of scope for the engine, so
    // reference rows enter through these instead of the trait.

    pub fn put_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    pub fn put_course(&self, course: Course) {
        self.inner.lock().unwrap().courses.insert(course.id, course);
    }

    pub fn put_lesson(&self, lesson: Lesson) {
        self.inner.lock().unwrap().lessons.push(lesson);
    }

    pub fn put_presentation(&self, presentation: Presentation) {
        self.inner
            .lock()
            .unwrap()
            .presentations
            .insert(presentation.id, presentation);
    }

    pub fn put_slide(&self, slide: Slide) {
        self.inner.lock().unwrap().slides.push(slide);
    }

    pub fn put_template(&self, template: CertificateTemplate) {
        self.inner.lock().unwrap().templates.push(template);
    }

    pub fn put_quiz(&self, quiz: Quiz) {
        self.inner.lock().unwrap().quizzes.insert(quiz.id, quiz);
    }
}

#[async_trait]
impl LearnStore for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> LearnResult<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn get_course(&self, course_id: Uuid) -> LearnResult<Option<Course>> {
        Ok(self.inner.lock().unwrap().courses.get(&course_id).cloned())
    }

    async fn lessons_for_course(&self, course_id: Uuid) -> LearnResult<Vec<Lesson>> {
        let inner = self.inner.lock().unwrap();
        let mut lessons: Vec<Lesson> = inner
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.lesson_order);
        Ok(lessons)
    }

    async fn get_presentation(&self, presentation_id: Uuid) -> LearnResult<Option<Presentation>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .presentations
            .get(&presentation_id)
            .cloned())
    }

    async fn slides_for_presentation(&self, presentation_id: Uuid) -> LearnResult<Vec<Slide>> {
        let inner = self.inner.lock().unwrap();
        let mut slides: Vec<Slide> = inner
            .slides
            .iter()
            .filter(|s| s.presentation_id == presentation_id)
            .cloned()
            .collect();
        slides.sort_by_key(|s| s.slide_number);
        Ok(slides)
    }

    async fn certificate_templates(&self) -> LearnResult<Vec<CertificateTemplate>> {
        Ok(self.inner.lock().unwrap().templates.clone())
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> LearnResult<Option<Quiz>> {
        Ok(self.inner.lock().unwrap().quizzes.get(&quiz_id).cloned())
    }

    async fn insert_quiz_attempt(&self, attempt: QuizAttempt) -> LearnResult<QuizAttempt> {
        self.inner.lock().unwrap().quiz_attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn count_quiz_attempts(&self, user_id: Uuid, quiz_id: Uuid) -> LearnResult<i64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .quiz_attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .count() as i64)
    }

    async fn upsert_slide_progress(&self, row: SlideProgress) -> LearnResult<SlideProgress> {
        self.inner
            .lock()
            .unwrap()
            .slide_progress
            .insert((row.user_id, row.slide_id), row.clone());
        Ok(row)
    }

    async fn slide_progress_for_presentation(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
    ) -> LearnResult<Vec<SlideProgress>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .slide_progress
            .values()
            .filter(|r| r.user_id == user_id && r.presentation_id == presentation_id)
            .cloned()
            .collect())
    }

    async fn get_presentation_progress(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
    ) -> LearnResult<Option<PresentationProgress>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .presentation_progress
            .get(&(user_id, presentation_id))
            .cloned())
    }

    async fn upsert_presentation_progress(
        &self,
        row: PresentationProgress,
    ) -> LearnResult<PresentationProgress> {
        self.inner
            .lock()
            .unwrap()
            .presentation_progress
            .insert((row.user_id, row.presentation_id), row.clone());
        Ok(row)
    }

    async fn upsert_lesson_progress(&self, row: LessonProgress) -> LearnResult<LessonProgress> {
        self.inner
            .lock()
            .unwrap()
            .lesson_progress
            .insert((row.user_id, row.lesson_id, row.course_id), row.clone());
        Ok(row)
    }

    async fn lesson_progress_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Vec<LessonProgress>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .lesson_progress
            .values()
            .filter(|r| r.user_id == user_id && r.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn get_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Option<Enrollment>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .get(&(user_id, course_id))
            .cloned())
    }

    async fn upsert_enrollment(&self, row: Enrollment) -> LearnResult<Enrollment> {
        self.inner
            .lock()
            .unwrap()
            .enrollments
            .insert((row.user_id, row.course_id), row.clone());
        Ok(row)
    }

    async fn get_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Option<Certificate>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .certificates
            .iter()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned())
    }

    async fn certificates_for_user(&self, user_id: Uuid) -> LearnResult<Vec<Certificate>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_certificate(&self, row: Certificate) -> LearnResult<Certificate> {
        self.inner.lock().unwrap().certificates.push(row.clone());
        Ok(row)
    }
}
