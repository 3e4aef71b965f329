use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::AuditRecord;
use crate::error::AuditServiceError;
use crate::state::AppState;
use crate::usecase::audit::ListAuditEventsUseCase;

#[derive(Deserialize)]
pub struct ListEventsQuery {
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct AuditEventResponse {
    pub event_id: Uuid,
    pub event_type: String,
    pub resource_id: String,
    pub task_id: Option<String>,
    pub action: String,
    pub payload: serde_json::Value,
    #[serde(serialize_with = "conveyor_core::serde::to_rfc3339_ms")]
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

impl From<AuditRecord> for AuditEventResponse {
    fn from(r: AuditRecord) -> Self {
        Self {
            event_id: r.event_id.0,
            event_type: r.event_type,
            resource_id: r.resource_id,
            task_id: r.task_id,
            action: r.action,
            payload: r.payload,
            processed_at: r.processed_at,
        }
    }
}

/// GET /events?limit=
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<AuditEventResponse>>, AuditServiceError> {
    let usecase = ListAuditEventsUseCase {
        repo: state.audit_repo(),
    };
    let records = usecase.execute(query.limit).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
