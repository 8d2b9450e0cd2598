use axum::{response::IntoResponse, Json};

pub type LearnResult<T> = Result<T, LearnError>;

#[derive(Debug, thiserror::Error)]
pub enum LearnError {
    #[error("Missing context: {0}")]
    MissingContext(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Cascade error: {0}")]
    Cascade(String),
    #[error("Issuance error: {0}")]
    Issuance(String),
}

impl IntoResponse for LearnError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::MissingContext(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Cascade(_) | Self::Issuance(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}

impl From<diesel::result::Error> for LearnError {
    fn from(e: diesel::result::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for LearnError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Persistence(format!("Failed to acquire connection: {}", e))
    }
}

impl From<serde_json::Error> for LearnError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.to_string())
    }
}
