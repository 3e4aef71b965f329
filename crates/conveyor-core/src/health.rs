use axum::http::StatusCode;
use sea_orm::DatabaseConnection;

/// `GET /healthz`: the process is up.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness for a service backed by `db`: 503 until the database answers a ping.
/// The broker is not probed.
pub async fn database_ready(db: &DatabaseConnection) -> StatusCode {
    match db.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe: database unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
