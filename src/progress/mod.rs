//! Progress module - the completion cascade
//!
//! One learner action enters at a leaf write and ripples upward: slide
//! write, presentation aggregate, lesson completion, course aggregate,
//! certificate issuance. Aggregates are always rebuilt from their source
//! rows (see `recompute`), never patched in place, so any step of the
//! chain can fail and be healed by the next trigger. Leaf write failures
//! surface to the caller; downstream failures are logged and swallowed.

pub mod recompute;
pub mod types;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::UserQuery;
use crate::certificate::CertificateIssuer;
use crate::shared::error::{LearnError, LearnResult};
use crate::shared::state::AppState;
use crate::store::LearnStore;

use types::{
    CompletionProvenance, CourseProgressResponse, Enrollment, LessonProgress,
    MarkLessonCompleteRequest, PresentationMetadata, PresentationProgress,
    RecordSlideProgressRequest, SlideProgress,
};

// ============================================================================
// PROGRESS ENGINE
// ============================================================================

/// Log-and-continue policy for downstream aggregation failures: the
/// upstream write stays durable and the next trigger rebuilds the
/// aggregate from source rows.
pub(crate) fn log_cascade(step: &str, e: LearnError) {
    log::warn!("{}", LearnError::Cascade(format!("{}: {}", step, e)));
}

pub struct ProgressEngine {
    store: Arc<dyn LearnStore>,
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn LearnStore>) -> Self {
        Self { store }
    }

    // ----- Slide level -----

    /// Record one slide interaction. Exactly one row exists afterward for
    /// (user, slide); a repeated call replaces the earlier row wholesale,
    /// since it represents the latest known state of that interaction.
    /// Always re-aggregates the presentation afterward.
    pub async fn record_slide_progress(
        &self,
        req: RecordSlideProgressRequest,
    ) -> LearnResult<SlideProgress> {
        let presentation_id = req
            .presentation_id
            .ok_or_else(|| LearnError::MissingContext("presentation_id is required".into()))?;
        let lesson_id = req
            .lesson_id
            .ok_or_else(|| LearnError::MissingContext("lesson_id is required".into()))?;
        let course_id = req
            .course_id
            .ok_or_else(|| LearnError::MissingContext("course_id is required".into()))?;

        let row = SlideProgress {
            user_id: req.user_id,
            slide_id: req.slide_id,
            presentation_id,
            lesson_id,
            course_id,
            viewed_at: Utc::now(),
            time_spent_seconds: req.time_spent_seconds,
            completed: req.completed,
            metadata: serde_json::to_value(&req.metadata)?,
        };
        let row = self.store.upsert_slide_progress(row).await?;

        if let Err(e) = self
            .recompute_presentation_progress(req.user_id, presentation_id, lesson_id, course_id)
            .await
        {
            log_cascade(
                &format!(
                    "presentation aggregation after slide write for user {} slide {}",
                    req.user_id, req.slide_id
                ),
                e,
            );
        }

        Ok(row)
    }

    // ----- Presentation level -----

    /// Rebuild the (user, presentation) aggregate from its slide rows and
    /// persist it. On the transition into 100% the owning lesson is marked
    /// complete with presentation provenance. Re-running without new slide
    /// writes reproduces the stored row exactly.
    pub async fn recompute_presentation_progress(
        &self,
        user_id: Uuid,
        presentation_id: Uuid,
        lesson_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<PresentationProgress> {
        let slides = self.store.slides_for_presentation(presentation_id).await?;
        let rows = self
            .store
            .slide_progress_for_presentation(user_id, presentation_id)
            .await?;
        let snapshot = recompute::presentation_snapshot(slides.len(), &rows);

        let previous = self
            .store
            .get_presentation_progress(user_id, presentation_id)
            .await?;
        let was_completed = previous.as_ref().map(|p| p.completed).unwrap_or(false);

        // completed_at is sticky while the aggregate stays at 100% and
        // cleared if it ever drops below.
        let completed_at = if snapshot.completed {
            previous
                .as_ref()
                .and_then(|p| p.completed_at)
                .or_else(|| Some(Utc::now()))
        } else {
            None
        };
        let last_accessed = snapshot
            .last_accessed
            .or_else(|| previous.as_ref().map(|p| p.last_accessed))
            .unwrap_or_else(Utc::now);

        let metadata = PresentationMetadata {
            quiz_scores: snapshot.quiz_scores.clone(),
            last_slide_viewed: snapshot.last_slide_viewed,
        };
        let row = PresentationProgress {
            user_id,
            presentation_id,
            lesson_id,
            course_id,
            completed_slides: snapshot.completed_slides,
            total_slides: snapshot.total_slides,
            progress_percentage: snapshot.progress_percentage,
            total_time_spent_seconds: snapshot.total_time_spent_seconds,
            completed: snapshot.completed,
            completed_at,
            last_accessed,
            metadata: serde_json::to_value(&metadata)?,
        };
        let row = self.store.upsert_presentation_progress(row).await?;

        if snapshot.completed && !was_completed {
            let provenance = CompletionProvenance::Presentation {
                presentation_id,
                slides_completed: snapshot.completed_slides,
                total_time_spent_seconds: snapshot.total_time_spent_seconds,
                quiz_scores: snapshot.quiz_scores,
            };
            if let Err(e) = self
                .mark_lesson_complete(user_id, lesson_id, course_id, true, provenance)
                .await
            {
                log_cascade(
                    &format!(
                        "lesson completion for user {} presentation {}",
                        user_id, presentation_id
                    ),
                    e,
                );
            }
        }

        Ok(row)
    }

    // ----- Lesson level -----

    /// Upsert the lesson completion state with its provenance and
    /// re-aggregate the course. `completed = false` explicitly un-completes
    /// a lesson (a failed quiz retake clears a previous pass), so the
    /// course aggregate must handle counts going down.
    pub async fn mark_lesson_complete(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        course_id: Uuid,
        completed: bool,
        provenance: CompletionProvenance,
    ) -> LearnResult<LessonProgress> {
        let row = LessonProgress {
            user_id,
            lesson_id,
            course_id,
            completed,
            completed_at: completed.then(Utc::now),
            metadata: serde_json::to_value(&provenance)?,
        };
        let row = self.store.upsert_lesson_progress(row).await?;

        if let Err(e) = self.recompute_course_progress(user_id, course_id).await {
            log_cascade(
                &format!(
                    "course aggregation after lesson update for user {} lesson {}",
                    user_id, lesson_id
                ),
                e,
            );
        }

        Ok(row)
    }

    // ----- Course level -----

    /// Rebuild the (user, course) enrollment aggregate from lesson counts.
    /// Unlike presentation progress, completion here regresses: dropping
    /// below 100% nulls `completed_at` again. At 100% the certificate
    /// issuer runs; neither a failed enrollment write nor a failed issuance
    /// withholds the computed percentage from the caller.
    pub async fn recompute_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<i32> {
        let lessons = self.store.lessons_for_course(course_id).await?;
        let progress_rows = self
            .store
            .lesson_progress_for_course(user_id, course_id)
            .await?;
        let completed_lessons = progress_rows.iter().filter(|r| r.completed).count();
        let snapshot = recompute::course_snapshot(lessons.len(), completed_lessons);

        let previous = self.store.get_enrollment(user_id, course_id).await?;
        let completed_at = if snapshot.completed {
            previous
                .as_ref()
                .and_then(|p| p.completed_at)
                .or_else(|| Some(Utc::now()))
        } else {
            None
        };

        let row = Enrollment {
            user_id,
            course_id,
            status: snapshot.status.to_string(),
            progress_percentage: snapshot.progress_percentage,
            completed_at,
            last_accessed: Utc::now(),
        };
        if let Err(e) = self.store.upsert_enrollment(row).await {
            log::warn!(
                "Enrollment update failed for user {} course {}: {}",
                user_id,
                course_id,
                e
            );
        }

        if snapshot.completed {
            let issuer = CertificateIssuer::new(self.store.clone());
            if let Err(e) = issuer.ensure_certificate(user_id, course_id).await {
                log::warn!(
                    "Certificate issuance failed for user {} course {}: {}",
                    user_id,
                    course_id,
                    e
                );
            }
        }

        Ok(snapshot.progress_percentage)
    }

    // ----- Reads -----

    pub async fn course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<CourseProgressResponse> {
        let lessons = self.store.lessons_for_course(course_id).await?;
        let lesson_progress = self
            .store
            .lesson_progress_for_course(user_id, course_id)
            .await?;
        let enrollment = self.store.get_enrollment(user_id, course_id).await?;
        let lessons_completed = lesson_progress.iter().filter(|r| r.completed).count() as i32;
        Ok(CourseProgressResponse {
            enrollment,
            lessons_total: lessons.len() as i32,
            lessons_completed,
            lesson_progress,
        })
    }
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// Record a slide interaction and run the completion cascade
pub async fn record_slide_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordSlideProgressRequest>,
) -> impl IntoResponse {
    let engine = ProgressEngine::new(state.store.clone());

    match engine.record_slide_progress(req).await {
        Ok(row) => Json(serde_json::json!({
            "success": true,
            "data": row
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Mark a lesson complete or not (manual action)
pub async fn mark_lesson_complete(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<Uuid>,
    Json(req): Json<MarkLessonCompleteRequest>,
) -> impl IntoResponse {
    let engine = ProgressEngine::new(state.store.clone());
    let provenance = CompletionProvenance::Manual { note: req.note };

    match engine
        .mark_lesson_complete(req.user_id, lesson_id, req.course_id, req.completed, provenance)
        .await
    {
        Ok(row) => Json(serde_json::json!({
            "success": true,
            "data": row
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a user's progress across a course
pub async fn get_course_progress(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let engine = ProgressEngine::new(state.store.clone());

    match engine.course_progress(query.user_id, course_id).await {
        Ok(progress) => Json(serde_json::json!({
            "success": true,
            "data": progress
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a user's aggregate for one presentation
pub async fn get_presentation_progress(
    State(state): State<Arc<AppState>>,
    Path(presentation_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    match state
        .store
        .get_presentation_progress(query.user_id, presentation_id)
        .await
    {
        Ok(progress) => Json(serde_json::json!({
            "success": true,
            "data": progress
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
