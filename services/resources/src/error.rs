use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Resources service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum ResourcesServiceError {
    #[error("resource not found")]
    ResourceNotFound,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ResourcesServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<conveyor_outbox::OutboxError> for ResourcesServiceError {
    fn from(e: conveyor_outbox::OutboxError) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ResourcesServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
