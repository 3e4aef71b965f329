use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use conveyor_domain::id::TaskId;

use crate::domain::types::ProcessedTask;
use crate::error::TasksServiceError;
use crate::state::AppState;
use crate::usecase::task::{GetTaskUseCase, ListTasksUseCase};

#[derive(Deserialize)]
pub struct ListTasksQuery {
    pub page_size: Option<u64>,
}

#[derive(Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub resource_id: String,
    pub action: String,
    pub status: String,
    pub result: Option<String>,
    pub last_event_id: Option<Uuid>,
    #[serde(serialize_with = "conveyor_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "conveyor_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProcessedTask> for TaskResponse {
    fn from(t: ProcessedTask) -> Self {
        Self {
            id: t.id.0,
            resource_id: t.resource_id,
            action: t.action,
            status: t.status.as_str().to_owned(),
            result: t.result,
            last_event_id: t.last_event_id.map(|e| e.0),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// GET /tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, TasksServiceError> {
    let usecase = GetTaskUseCase {
        repo: state.task_repo(),
    };
    let task = usecase.execute(TaskId(id)).await?;
    Ok(Json(task.into()))
}

/// GET /tasks?page_size=
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, TasksServiceError> {
    let usecase = ListTasksUseCase {
        repo: state.task_repo(),
    };
    let tasks = usecase.execute(query.page_size).await?;
    Ok(Json(tasks.into_iter().map(Into::into).collect()))
}
