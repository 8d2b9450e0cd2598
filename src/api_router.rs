//! API Router
//!
//! Combines the engine's HTTP endpoints into a unified router. Everything
//! lives under /api/learn; authentication and session handling sit in front
//! of this service and are not its concern.

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::shared::state::AppState;

/// Configure all API routes from all modules
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // ===== Catalog (read-only) =====
        .route("/api/learn/courses/:id", get(crate::catalog::get_course))
        .route(
            "/api/learn/presentations/:id",
            get(crate::catalog::get_presentation),
        )
        // ===== Progress cascade =====
        .route(
            "/api/learn/progress/slide",
            post(crate::progress::record_slide_progress),
        )
        .route(
            "/api/learn/lessons/:id/complete",
            post(crate::progress::mark_lesson_complete),
        )
        .route(
            "/api/learn/courses/:id/progress",
            get(crate::progress::get_course_progress),
        )
        .route(
            "/api/learn/presentations/:id/progress",
            get(crate::progress::get_presentation_progress),
        )
        // ===== Quizzes =====
        .route("/api/learn/quizzes/:id", get(crate::quiz::get_quiz))
        .route(
            "/api/learn/quizzes/:id/submit",
            post(crate::quiz::submit_quiz),
        )
        // ===== Certificates =====
        .route(
            "/api/learn/certificates",
            get(crate::certificate::get_certificates),
        )
}
