use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AuditServiceError {
    /// The inbound event can never be recorded as sent.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuditServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AuditServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidEvent(_) => StatusCode::BAD_REQUEST,
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
