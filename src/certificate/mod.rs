//! Certificate module - issuance on course completion
//!
//! Issuance is the decision plus the record; visual rendering happens
//! elsewhere. Exactly one certificate may exist per (user, course) pair,
//! enforced by check-then-insert: the cascade invokes this at most once per
//! completion transition, and a duplicate trigger finds the existing row.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::UserQuery;
use crate::shared::error::{LearnError, LearnResult};
use crate::shared::state::AppState;
use crate::store::LearnStore;

// ============================================================================
// DATABASE SCHEMA
// ============================================================================

diesel::table! {
    learn_certificates (id) {
        id -> Uuid,
        user_id -> Uuid,
        course_id -> Uuid,
        issued_at -> Timestamptz,
        certificate_data -> Jsonb,
        template_id -> Nullable<Uuid>,
    }
}

// ============================================================================
// DATA MODELS
// ============================================================================

/// Issued once, never mutated. Survives later enrollment regression.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = learn_certificates)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub certificate_data: serde_json::Value,
    pub template_id: Option<Uuid>,
}

/// Denormalized display snapshot frozen at issuance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateData {
    pub certificate_id: String,
    pub learner_name: String,
    pub course_title: String,
    pub completion_date: DateTime<Utc>,
    pub instructor: Option<String>,
    pub organization: Option<String>,
    pub template: String,
}

/// Template reference used when no template row exists at all.
pub const FALLBACK_TEMPLATE: &str = "classic";

fn certificate_code(now: DateTime<Utc>) -> String {
    format!(
        "LC-{}-{}",
        now.format("%Y%m%d"),
        &Uuid::new_v4().to_string()[..8].to_uppercase()
    )
}

// ============================================================================
// CERTIFICATE ISSUER
// ============================================================================

pub struct CertificateIssuer {
    store: Arc<dyn LearnStore>,
}

impl CertificateIssuer {
    pub fn new(store: Arc<dyn LearnStore>) -> Self {
        Self { store }
    }

    /// Ensure exactly one certificate exists for (user, course). An
    /// existing row is returned unchanged; otherwise a fully-formed payload
    /// is built first and written in a single insert, so no half-populated
    /// row can be observed.
    pub async fn ensure_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LearnResult<Certificate> {
        if let Some(existing) = self.store.get_certificate(user_id, course_id).await? {
            return Ok(existing);
        }

        let user = self.store.get_user(user_id).await?;
        let course = self.store.get_course(course_id).await?;
        if user.is_none() && course.is_none() {
            return Err(LearnError::Issuance(format!(
                "Cannot issue certificate: neither user {} nor course {} could be resolved",
                user_id, course_id
            )));
        }

        let templates = self.store.certificate_templates().await?;
        let template = templates
            .iter()
            .find(|t| t.is_default)
            .or_else(|| templates.first());

        let now = Utc::now();
        let data = CertificateData {
            certificate_id: certificate_code(now),
            learner_name: user
                .map(|u| u.full_name)
                .unwrap_or_else(|| "Unknown learner".to_string()),
            course_title: course
                .as_ref()
                .map(|c| c.title.clone())
                .unwrap_or_else(|| "Unknown course".to_string()),
            completion_date: now,
            instructor: course.as_ref().and_then(|c| c.instructor.clone()),
            organization: course.as_ref().and_then(|c| c.organization.clone()),
            template: template
                .map(|t| t.name.clone())
                .unwrap_or_else(|| FALLBACK_TEMPLATE.to_string()),
        };

        let certificate = Certificate {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            issued_at: now,
            certificate_data: serde_json::to_value(&data)
                .map_err(|e| LearnError::Issuance(e.to_string()))?,
            template_id: template.map(|t| t.id),
        };

        let certificate = self.store.insert_certificate(certificate).await?;
        log::info!(
            "Issued certificate {} for user {} on course {}",
            data.certificate_id,
            user_id,
            course_id
        );
        Ok(certificate)
    }

    pub async fn certificates_for_user(&self, user_id: Uuid) -> LearnResult<Vec<Certificate>> {
        self.store.certificates_for_user(user_id).await
    }
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// List certificates earned by a user
pub async fn get_certificates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let issuer = CertificateIssuer::new(state.store.clone());

    match issuer.certificates_for_user(query.user_id).await {
        Ok(certificates) => Json(serde_json::json!({
            "success": true,
            "data": certificates
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
