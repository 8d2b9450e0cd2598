//! Store module - the row-level persistence contract
//!
//! The engine consumes the relational store through this trait: get/list,
//! insert, and upserts keyed on the composite uniqueness constraints of the
//! data model. `PgStore` is the Diesel/Postgres implementation used in
//! production; `MemoryStore` backs integration tests and local development
//! without a database.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{CertificateTemplate, Course, Lesson, Presentation, Slide, User};
use crate::certificate::Certificate;
use crate::progress::types::{Enrollment, LessonProgress, PresentationProgress, SlideProgress};
use crate::quiz::{Quiz, QuizAttempt};
use crate::shared::error::LearnResult;

#[async_trait]
pub trait LearnStore: Send + Sync {
    // ----- Reference data -----

    async fn get_user(&self, user_id: Uuid) -> LearnResult<Option<User>>;
    async fn get_course(&self, course_id: Uuid) -> LearnResult<Option<Course>>;
    /// Lessons of a course in `lesson_order`.
    async fn lessons_for_course(&self, course_id: Uuid) -> LearnResult<Vec<Lesson>>;
    async fn get_presentation(&self, presentation_id: Uuid) -> LearnResult<Option<Presentation>>;
    /// Slides of a presentation in `slide_number` order; the source of
    /// truth for total slide counts.
    async fn slides_for_presentation(&self, presentation_id: Uuid) -> LearnResult<Vec<Slide>>;
    async fn certificate_templates(&self) -> LearnResult<Vec<CertificateTemplate>>;

    // ----- Quizzes -----

    async fn get_quiz(&self, quiz_id: Uuid) -> LearnResult<Option<Quiz>>;
    /// Append-only: (user_id, quiz_id) is deliberately not unique.
    async fn insert_quiz_attempt(&self, attempt: QuizAttempt) -> LearnResult<QuizAttempt>;
    async fn count_quiz_attempts(&self, user_id: Uuid, quiz_id: Uuid) -> LearnResult<i64>;

    // ----- Slide progress (leaf writes) -----

    /// Upsert on (user_id, slide_id); a second write fully replaces the row.
    async fn upsert_slide_progress(&self, row: SlideProgress) -> LearnResult<SlideProgress>;
    async fn slide_progress_for_presentation(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
    ) -> LearnResult<Vec<SlideProgress>>;

    // ----- Derived aggregates -----

    async fn get_presentation_progress(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
    ) -> LearnResult<Option<PresentationProgress>>;
    /// Upsert on (user_id, presentation_id).
    async fn upsert_presentation_progress(
        &self,
        row: PresentationProgress,
    ) -> LearnResult<PresentationProgress>;

    /// Upsert on (user_id, lesson_id, course_id).
    async fn upsert_lesson_progress(&self, row: LessonProgress) -> LearnResult<LessonProgress>;
    async fn lesson_progress_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Vec<LessonProgress>>;

    async fn get_enrollment(&self, user_id: Uuid, course_id: Uuid)
        -> LearnResult<Option<Enrollment>>;
    /// Upsert on (user_id, course_id).
    async fn upsert_enrollment(&self, row: Enrollment) -> LearnResult<Enrollment>;

    // ----- Certificates -----

    async fn get_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Option<Certificate>>;
    async fn certificates_for_user(&self, user_id: Uuid) -> LearnResult<Vec<Certificate>>;
    async fn insert_certificate(&self, row: Certificate) -> LearnResult<Certificate>;
}
