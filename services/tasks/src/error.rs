use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Tasks service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum TasksServiceError {
    #[error("task not found")]
    TaskNotFound,
    /// The inbound event can never be processed as sent.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl TasksServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<conveyor_outbox::OutboxError> for TasksServiceError {
    fn from(e: conveyor_outbox::OutboxError) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for TasksServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::TaskNotFound => StatusCode::NOT_FOUND,
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
