use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{Resource, STATUS_ACTIVE};
use crate::error::ResourcesServiceError;
use crate::state::AppState;
use crate::usecase::resource::{
    CreateResourceInput, CreateResourceUseCase, DeleteResourceUseCase, GetResourceUseCase,
    ListResourcesUseCase, UpdateResourceInput, UpdateResourceUseCase,
};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateResourceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateResourceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    STATUS_ACTIVE.to_owned()
}

#[derive(Serialize)]
pub struct ResourceResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    #[serde(serialize_with = "conveyor_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "conveyor_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Resource> for ResourceResponse {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ── POST /resources ──────────────────────────────────────────────────────────

pub async fn create_resource(
    State(state): State<AppState>,
    Json(body): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), ResourcesServiceError> {
    let uc = CreateResourceUseCase {
        repo: state.resource_repo(),
    };
    let resource = uc
        .execute(CreateResourceInput {
            name: body.name,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(resource.into())))
}

// ── GET /resources ───────────────────────────────────────────────────────────

pub async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResourceResponse>>, ResourcesServiceError> {
    let uc = ListResourcesUseCase {
        repo: state.resource_repo(),
    };
    let resources = uc.execute().await?;
    Ok(Json(resources.into_iter().map(Into::into).collect()))
}

// ── GET /resources/{id} ──────────────────────────────────────────────────────

pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResourceResponse>, ResourcesServiceError> {
    let uc = GetResourceUseCase {
        repo: state.resource_repo(),
    };
    Ok(Json(uc.execute(id).await?.into()))
}

// ── PUT /resources/{id} ──────────────────────────────────────────────────────

pub async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateResourceRequest>,
) -> Result<Json<ResourceResponse>, ResourcesServiceError> {
    let uc = UpdateResourceUseCase {
        repo: state.resource_repo(),
    };
    let resource = uc
        .execute(UpdateResourceInput {
            id,
            name: body.name,
            description: body.description,
            status: body.status,
        })
        .await?;
    Ok(Json(resource.into()))
}

// ── DELETE /resources/{id} ───────────────────────────────────────────────────

pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ResourcesServiceError> {
    let uc = DeleteResourceUseCase {
        repo: state.resource_repo(),
    };
    uc.execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
