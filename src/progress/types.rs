//! Types for the progress engine
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// DATABASE SCHEMA
// ============================================================================

diesel::table! {
    learn_slide_progress (user_id, slide_id) {
        user_id -> Uuid,
        slide_id -> Uuid,
        presentation_id -> Uuid,
        lesson_id -> Uuid,
        course_id -> Uuid,
        viewed_at -> Timestamptz,
        time_spent_seconds -> Int4,
        completed -> Bool,
        metadata -> Jsonb,
    }
}

diesel::table! {
    learn_presentation_progress (user_id, presentation_id) {
        user_id -> Uuid,
        presentation_id -> Uuid,
        lesson_id -> Uuid,
        course_id -> Uuid,
        completed_slides -> Int4,
        total_slides -> Int4,
        progress_percentage -> Int4,
        total_time_spent_seconds -> Int4,
        completed -> Bool,
        completed_at -> Nullable<Timestamptz>,
        last_accessed -> Timestamptz,
        metadata -> Jsonb,
    }
}

diesel::table! {
    learn_lesson_progress (user_id, lesson_id, course_id) {
        user_id -> Uuid,
        lesson_id -> Uuid,
        course_id -> Uuid,
        completed -> Bool,
        completed_at -> Nullable<Timestamptz>,
        metadata -> Jsonb,
    }
}

diesel::table! {
    learn_enrollments (user_id, course_id) {
        user_id -> Uuid,
        course_id -> Uuid,
        status -> Text,
        progress_percentage -> Int4,
        completed_at -> Nullable<Timestamptz>,
        last_accessed -> Timestamptz,
    }
}

// ============================================================================
// DATA MODELS
// ============================================================================

/// Leaf record of one learner interacting with one slide. At most one row
/// per (user, slide); a later write fully replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = learn_slide_progress)]
pub struct SlideProgress {
    pub user_id: Uuid,
    pub slide_id: Uuid,
    pub presentation_id: Uuid,
    pub lesson_id: Uuid,
    pub course_id: Uuid,
    pub viewed_at: DateTime<Utc>,
    pub time_spent_seconds: i32,
    pub completed: bool,
    pub metadata: serde_json::Value,
}

/// Derived aggregate over the slide rows of one presentation. Recomputed
/// from source rows on every trigger, never patched incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = learn_presentation_progress)]
pub struct PresentationProgress {
    pub user_id: Uuid,
    pub presentation_id: Uuid,
    pub lesson_id: Uuid,
    pub course_id: Uuid,
    pub completed_slides: i32,
    pub total_slides: i32,
    pub progress_percentage: i32,
    pub total_time_spent_seconds: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = learn_lesson_progress)]
pub struct LessonProgress {
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub course_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = learn_enrollments)]
pub struct Enrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub progress_percentage: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl From<&str> for ProgressStatus {
    fn from(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::NotStarted,
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ----- Metadata shapes -----

/// Interaction metadata carried on a slide row. `quiz_scores` maps quiz id
/// to the latest attempt percentage; callers send the full current map,
/// not a delta. Unknown keys are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideMetadata {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub quiz_scores: HashMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_order: Option<i32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Aggregate metadata on a presentation row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationMetadata {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub quiz_scores: HashMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_slide_viewed: Option<i32>,
}

/// How a lesson completion came about. Tagged so downstream consumers can
/// branch exhaustively instead of probing an untyped bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "completed_via", rename_all = "snake_case")]
pub enum CompletionProvenance {
    Presentation {
        presentation_id: Uuid,
        slides_completed: i32,
        total_time_spent_seconds: i32,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        quiz_scores: HashMap<String, i32>,
    },
    Quiz {
        quiz_id: Uuid,
        attempt_id: Uuid,
        percentage: i32,
        score: i32,
    },
    Manual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

// ----- Requests -----

/// Payload for recording one slide interaction. The three context ids are
/// optional at the wire level so a partially-keyed row can be rejected
/// before any write happens.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSlideProgressRequest {
    pub user_id: Uuid,
    pub slide_id: Uuid,
    pub presentation_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub time_spent_seconds: i32,
    #[serde(default = "default_completed")]
    pub completed: bool,
    #[serde(default)]
    pub metadata: SlideMetadata,
}

fn default_completed() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkLessonCompleteRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub completed: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseProgressResponse {
    pub enrollment: Option<Enrollment>,
    pub lessons_total: i32,
    pub lessons_completed: i32,
    pub lesson_progress: Vec<LessonProgress>,
}
