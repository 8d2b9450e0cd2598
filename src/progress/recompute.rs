//! Pure aggregate recomputation.
//!
//! Every derived row is rebuilt entirely from its source rows on each
//! trigger. These functions take the source rows and return the derived
//! state; the engine in `mod.rs` is only responsible for loading inputs,
//! persisting outputs and firing the next step of the cascade. Calling any
//! of them twice on the same inputs yields the same output.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::types::{ProgressStatus, SlideMetadata, SlideProgress};

/// round(100 * completed / total), 0 when there is nothing to complete.
pub fn percentage(completed: usize, total: usize) -> i32 {
    if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as i32
    }
}

/// Derived state of one (user, presentation) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationSnapshot {
    pub completed_slides: i32,
    pub total_slides: i32,
    pub progress_percentage: i32,
    pub total_time_spent_seconds: i32,
    pub completed: bool,
    pub quiz_scores: HashMap<String, i32>,
    pub last_slide_viewed: Option<i32>,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Rebuild a presentation aggregate from its slide rows.
///
/// `total_slides` comes from the slide list, not from the progress rows: a
/// learner with no rows yet still has a well-defined 0% aggregate. Quiz
/// score maps merge in `viewed_at` order so the most recent row wins on a
/// key collision.
pub fn presentation_snapshot(total_slides: usize, rows: &[SlideProgress]) -> PresentationSnapshot {
    let mut done: Vec<&SlideProgress> = rows.iter().filter(|r| r.completed).collect();
    done.sort_by_key(|r| r.viewed_at);

    let completed_slides = done.len();
    let total_time_spent_seconds = done.iter().map(|r| r.time_spent_seconds).sum();

    let mut quiz_scores = HashMap::new();
    let mut last_slide_viewed = None;
    for row in &done {
        let meta: SlideMetadata = serde_json::from_value(row.metadata.clone()).unwrap_or_default();
        quiz_scores.extend(meta.quiz_scores);
        if let Some(order) = meta.slide_order {
            last_slide_viewed = Some(order);
        }
    }

    let progress_percentage = percentage(completed_slides, total_slides);

    PresentationSnapshot {
        completed_slides: completed_slides as i32,
        total_slides: total_slides as i32,
        progress_percentage,
        total_time_spent_seconds,
        completed: total_slides > 0 && progress_percentage == 100,
        quiz_scores,
        last_slide_viewed,
        last_accessed: done.last().map(|r| r.viewed_at),
    }
}

/// Derived state of one (user, course) enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSnapshot {
    pub lessons_total: i32,
    pub lessons_completed: i32,
    pub progress_percentage: i32,
    pub completed: bool,
    pub status: ProgressStatus,
}

/// Rebuild the course aggregate from lesson counts. `total_lessons` comes
/// from the lesson table; completion counts may decrease when a lesson is
/// explicitly un-completed.
pub fn course_snapshot(total_lessons: usize, completed_lessons: usize) -> CourseSnapshot {
    let progress_percentage = percentage(completed_lessons, total_lessons);
    let completed = total_lessons > 0 && progress_percentage == 100;
    let status = if completed {
        ProgressStatus::Completed
    } else if completed_lessons > 0 {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    };
    CourseSnapshot {
        lessons_total: total_lessons as i32,
        lessons_completed: completed_lessons as i32,
        progress_percentage,
        completed,
        status,
    }
}
