//! Catalog module - reference data for the progress engine
//!
//! Courses, lessons, presentations, slides, learner display records and
//! certificate templates. Authoring flows live outside this service; the
//! engine consumes these rows read-only when recomputing aggregates.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::state::AppState;

// ============================================================================
// DATABASE SCHEMA
// ============================================================================

diesel::table! {
    learn_users (id) {
        id -> Uuid,
        full_name -> Text,
        email -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_courses (id) {
        id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        instructor -> Nullable<Text>,
        organization -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    learn_lessons (id) {
        id -> Uuid,
        course_id -> Uuid,
        title -> Text,
        lesson_order -> Int4,
    }
}

diesel::table! {
    learn_presentations (id) {
        id -> Uuid,
        lesson_id -> Uuid,
        title -> Text,
        estimated_duration_minutes -> Int4,
    }
}

diesel::table! {
    learn_slides (id) {
        id -> Uuid,
        presentation_id -> Uuid,
        slide_number -> Int4,
        content_type -> Text,
        metadata -> Jsonb,
    }
}

diesel::table! {
    learn_certificate_templates (id) {
        id -> Uuid,
        name -> Text,
        is_default -> Bool,
    }
}

// ============================================================================
// DATA MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_users)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_courses)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_lessons)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub lesson_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_presentations)]
pub struct Presentation {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub title: String,
    pub estimated_duration_minutes: i32,
}

/// One content unit within a presentation. `metadata` may carry a
/// `quiz_id` reference for quiz slides, or the page/image mapping
/// produced by the document pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_slides)]
pub struct Slide {
    pub id: Uuid,
    pub presentation_id: Uuid,
    pub slide_number: i32,
    pub content_type: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_certificate_templates)]
pub struct CertificateTemplate {
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Image,
    Video,
    Pdf,
    Audio,
    Document,
    Quiz,
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        match s {
            "image" => Self::Image,
            "video" => Self::Video,
            "pdf" => Self::Pdf,
            "audio" => Self::Audio,
            "document" => Self::Document,
            "quiz" => Self::Quiz,
            _ => Self::Text,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::Pdf => write!(f, "pdf"),
            Self::Audio => write!(f, "audio"),
            Self::Document => write!(f, "document"),
            Self::Quiz => write!(f, "quiz"),
        }
    }
}

impl Slide {
    /// Quiz reference for quiz slides, taken from `metadata.quiz_id`.
    pub fn quiz_id(&self) -> Option<Uuid> {
        self.metadata
            .get("quiz_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetailResponse {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// Get course details with ordered lessons
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> impl IntoResponse {
    let course = match state.store.get_course(course_id).await {
        Ok(Some(course)) => course,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Course not found"
                })),
            )
                .into_response()
        }
        Err(e) => return e.into_response(),
    };

    match state.store.lessons_for_course(course_id).await {
        Ok(lessons) => Json(serde_json::json!({
            "success": true,
            "data": CourseDetailResponse { course, lessons }
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a presentation with its ordered slide list
pub async fn get_presentation(
    State(state): State<Arc<AppState>>,
    Path(presentation_id): Path<Uuid>,
) -> impl IntoResponse {
    let presentation = match state.store.get_presentation(presentation_id).await {
        Ok(Some(presentation)) => presentation,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Presentation not found"
                })),
            )
                .into_response()
        }
        Err(e) => return e.into_response(),
    };

    match state.store.slides_for_presentation(presentation_id).await {
        Ok(slides) => Json(serde_json::json!({
            "success": true,
            "data": {
                "presentation": presentation,
                "slides": slides
            }
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_conversion() {
        assert_eq!(ContentType::from("text"), ContentType::Text);
        assert_eq!(ContentType::from("quiz"), ContentType::Quiz);
        assert_eq!(ContentType::from("pdf"), ContentType::Pdf);
        assert_eq!(ContentType::from("unknown"), ContentType::Text);
    }

    #[test]
    fn test_content_type_display() {
        assert_eq!(ContentType::Document.to_string(), "document");
        assert_eq!(ContentType::Video.to_string(), "video");
    }

    #[test]
    fn test_slide_quiz_reference() {
        let quiz_id = Uuid::new_v4();
        let slide = Slide {
            id: Uuid::new_v4(),
            presentation_id: Uuid::new_v4(),
            slide_number: 1,
            content_type: ContentType::Quiz.to_string(),
            metadata: serde_json::json!({ "quiz_id": quiz_id.to_string() }),
        };
        assert_eq!(slide.quiz_id(), Some(quiz_id));

        let plain = Slide {
            metadata: serde_json::json!({}),
            ..slide
        };
        assert_eq!(plain.quiz_id(), None);
    }
}
