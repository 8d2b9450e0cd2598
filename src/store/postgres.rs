//! Diesel/Postgres store.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use uuid::Uuid;

use crate::catalog::{
    learn_certificate_templates, learn_courses, learn_lessons, learn_presentations, learn_slides,
    learn_users, CertificateTemplate, Course, Lesson, Presentation, Slide, User,
};
use crate::certificate::{learn_certificates, Certificate};
use crate::progress::types::{
    learn_enrollments, learn_lesson_progress, learn_presentation_progress, learn_slide_progress,
    Enrollment, LessonProgress, PresentationProgress, SlideProgress,
};
use crate::quiz::{learn_quiz_attempts, learn_quizzes, Quiz, QuizAttempt};
use crate::shared::error::LearnResult;
use crate::shared::utils::{create_pool, DbPool};

use super::LearnStore;

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn connect(database_url: &str) -> LearnResult<Self> {
        Ok(Self {
            pool: create_pool(database_url)?,
        })
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> LearnResult<PgPooled> {
        Ok(self.pool.get()?)
    }
}

#[async_trait]
impl LearnStore for PgStore {
    async fn get_user(&self, user_id: Uuid) -> LearnResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(learn_users::table
            .filter(learn_users::id.eq(user_id))
            .first::<User>(&mut conn)
            .optional()?)
    }

    async fn get_course(&self, course_id: Uuid) -> LearnResult<Option<Course>> {
        let mut conn = self.conn()?;
        Ok(learn_courses::table
            .filter(learn_courses::id.eq(course_id))
            .first::<Course>(&mut conn)
            .optional()?)
    }

    async fn lessons_for_course(&self, course_id: Uuid) -> LearnResult<Vec<Lesson>> {
        let mut conn = self.conn()?;
        Ok(learn_lessons::table
            .filter(learn_lessons::course_id.eq(course_id))
            .order(learn_lessons::lesson_order.asc())
            .load::<Lesson>(&mut conn)?)
    }

    async fn get_presentation(&self, presentation_id: Uuid) -> LearnResult<Option<Presentation>> {
        let mut conn = self.conn()?;
        Ok(learn_presentations::table
            .filter(learn_presentations::id.eq(presentation_id))
            .first::<Presentation>(&mut conn)
            .optional()?)
    }

    async fn slides_for_presentation(&self, presentation_id: Uuid) -> LearnResult<Vec<Slide>> {
        let mut conn = self.conn()?;
        Ok(learn_slides::table
            .filter(learn_slides::presentation_id.eq(presentation_id))
            .order(learn_slides::slide_number.asc())
            .load::<Slide>(&mut conn)?)
    }

    async fn certificate_templates(&self) -> LearnResult<Vec<CertificateTemplate>> {
        let mut conn = self.conn()?;
        Ok(learn_certificate_templates::table
            .order(learn_certificate_templates::name.asc())
            .load::<CertificateTemplate>(&mut conn)?)
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> LearnResult<Option<Quiz>> {
        let mut conn = self.conn()?;
        Ok(learn_quizzes::table
            .filter(learn_quizzes::id.eq(quiz_id))
            .first::<Quiz>(&mut conn)
            .optional()?)
    }

    async fn insert_quiz_attempt(&self, attempt: QuizAttempt) -> LearnResult<QuizAttempt> {
        let mut conn = self.conn()?;
        diesel::insert_into(learn_quiz_attempts::table)
            .values(&attempt)
            .execute(&mut conn)?;
        Ok(attempt)
    }

    async fn count_quiz_attempts(&self, user_id: Uuid, quiz_id: Uuid) -> LearnResult<i64> {
        let mut conn = self.conn()?;
        Ok(learn_quiz_attempts::table
            .filter(learn_quiz_attempts::user_id.eq(user_id))
            .filter(learn_quiz_attempts::quiz_id.eq(quiz_id))
            .count()
            .get_result(&mut conn)?)
    }

    async fn upsert_slide_progress(&self, row: SlideProgress) -> LearnResult<SlideProgress> {
        let mut conn = self.conn()?;
        diesel::insert_into(learn_slide_progress::table)
            .values(&row)
            .on_conflict((
                learn_slide_progress::user_id,
                learn_slide_progress::slide_id,
            ))
            .do_update()
            .set((
                learn_slide_progress::presentation_id.eq(row.presentation_id),
                learn_slide_progress::lesson_id.eq(row.lesson_id),
                learn_slide_progress::course_id.eq(row.course_id),
                learn_slide_progress::viewed_at.eq(row.viewed_at),
                learn_slide_progress::time_spent_seconds.eq(row.time_spent_seconds),
                learn_slide_progress::completed.eq(row.completed),
                learn_slide_progress::metadata.eq(&row.metadata),
            ))
            .execute(&mut conn)?;
        Ok(row)
    }

    async fn slide_progress_for_presentation(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
    ) -> LearnResult<Vec<SlideProgress>> {
        let mut conn = self.conn()?;
        Ok(learn_slide_progress::table
            .filter(learn_slide_progress::user_id.eq(user_id))
            .filter(learn_slide_progress::presentation_id.eq(presentation_id))
            .order(learn_slide_progress::viewed_at.asc())
            .load::<SlideProgress>(&mut conn)?)
    }

    async fn get_presentation_progress(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
    ) -> LearnResult<Option<PresentationProgress>> {
        let mut conn = self.conn()?;
        Ok(learn_presentation_progress::table
            .filter(learn_presentation_progress::user_id.eq(user_id))
            .filter(learn_presentation_progress::presentation_id.eq(presentation_id))
            .first::<PresentationProgress>(&mut conn)
            .optional()?)
    }

    async fn upsert_presentation_progress(
        &self,
        row: PresentationProgress,
    ) -> LearnResult<PresentationProgress> {
        let mut conn = self.conn()?;
        diesel::insert_into(learn_presentation_progress::table)
            .values(&row)
            .on_conflict((
                learn_presentation_progress::user_id,
                learn_presentation_progress::presentation_id,
            ))
            .do_update()
            .set((
                learn_presentation_progress::lesson_id.eq(row.lesson_id),
                learn_presentation_progress::course_id.eq(row.course_id),
                learn_presentation_progress::completed_slides.eq(row.completed_slides),
                learn_presentation_progress::total_slides.eq(row.total_slides),
                learn_presentation_progress::progress_percentage.eq(row.progress_percentage),
                learn_presentation_progress::total_time_spent_seconds
                    .eq(row.total_time_spent_seconds),
                learn_presentation_progress::completed.eq(row.completed),
                learn_presentation_progress::completed_at.eq(row.completed_at),
                learn_presentation_progress::last_accessed.eq(row.last_accessed),
                learn_presentation_progress::metadata.eq(&row.metadata),
            ))
            .execute(&mut conn)?;
        Ok(row)
    }

    async fn upsert_lesson_progress(&self, row: LessonProgress) -> LearnResult<LessonProgress> {
        let mut conn = self.conn()?;
        diesel::insert_into(learn_lesson_progress::table)
            .values(&row)
            .on_conflict((
                learn_lesson_progress::user_id,
                learn_lesson_progress::lesson_id,
                learn_lesson_progress::course_id,
            ))
            .do_update()
            .set((
                learn_lesson_progress::completed.eq(row.completed),
                learn_lesson_progress::completed_at.eq(row.completed_at),
                learn_lesson_progress::metadata.eq(&row.metadata),
            ))
            .execute(&mut conn)?;
        Ok(row)
    }

    async fn lesson_progress_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Vec<LessonProgress>> {
        let mut conn = self.conn()?;
        Ok(learn_lesson_progress::table
            .filter(learn_lesson_progress::user_id.eq(user_id))
            .filter(learn_lesson_progress::course_id.eq(course_id))
            .load::<LessonProgress>(&mut conn)?)
    }

    async fn get_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Option<Enrollment>> {
        let mut conn = self.conn()?;
        Ok(learn_enrollments::table
            .filter(learn_enrollments::user_id.eq(user_id))
            .filter(learn_enrollments::course_id.eq(course_id))
            .first::<Enrollment>(&mut conn)
            .optional()?)
    }

    async fn upsert_enrollment(&self, row: Enrollment) -> LearnResult<Enrollment> {
        let mut conn = self.conn()?;
        diesel::insert_into(learn_enrollments::table)
            .values(&row)
            .on_conflict((learn_enrollments::user_id, learn_enrollments::course_id))
            .do_update()
            .set((
                learn_enrollments::status.eq(&row.status),
                learn_enrollments::progress_percentage.eq(row.progress_percentage),
                learn_enrollments::completed_at.eq(row.completed_at),
                learn_enrollments::last_accessed.eq(row.last_accessed),
            ))
            .execute(&mut conn)?;
        Ok(row)
    }

    async fn get_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Option<Certificate>> {
        let mut conn = self.conn()?;
        Ok(learn_certificates::table
            .filter(learn_certificates::user_id.eq(user_id))
            .filter(learn_certificates::course_id.eq(course_id))
            .first::<Certificate>(&mut conn)
            .optional()?)
    }

    async fn certificates_for_user(&self, user_id: Uuid) -> LearnResult<Vec<Certificate>> {
        let mut conn = self.conn()?;
        Ok(learn_certificates::table
            .filter(learn_certificates::user_id.eq(user_id))
            .order(learn_certificates::issued_at.desc())
            .load::<Certificate>(&mut conn)?)
    }

    async fn insert_certificate(&self, row: Certificate) -> LearnResult<Certificate> {
        let mut conn = self.conn()?;
        diesel::insert_into(learn_certificates::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(row)
    }
}
