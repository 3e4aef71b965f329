use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use conveyor_domain::event::{RESOURCE_CREATED, RESOURCE_DELETED, RESOURCE_UPDATED};
use conveyor_outbox::OutboxEvent;

use crate::domain::repository::ResourceRepository;
use crate::domain::types::{Resource, ResourceUpdate, STATUS_ACTIVE, deleted_event};
use crate::error::ResourcesServiceError;

/// Upper bound for `GET /resources`.
pub const LIST_LIMIT: u64 = 100;

// ── CreateResource ───────────────────────────────────────────────────────────

pub struct CreateResourceInput {
    pub name: String,
    pub description: String,
}

pub struct CreateResourceUseCase<R: ResourceRepository> {
    pub repo: R,
}

impl<R: ResourceRepository> CreateResourceUseCase<R> {
    pub async fn execute(
        &self,
        input: CreateResourceInput,
    ) -> Result<Resource, ResourcesServiceError> {
        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            status: STATUS_ACTIVE.to_owned(),
            created_at: now,
            updated_at: now,
        };
        let event = OutboxEvent::json(resource.id, RESOURCE_CREATED, &resource.changed_event())?;

        self.repo.create_with_outbox(&resource, &event).await?;
        info!(resource_id = %resource.id, event_id = %event.id, "resource created");
        Ok(resource)
    }
}

// ── GetResource ──────────────────────────────────────────────────────────────

pub struct GetResourceUseCase<R: ResourceRepository> {
    pub repo: R,
}

impl<R: ResourceRepository> GetResourceUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<Resource, ResourcesServiceError> {
        self.repo
            .find(id)
            .await?
            .ok_or(ResourcesServiceError::ResourceNotFound)
    }
}

// ── ListResources ────────────────────────────────────────────────────────────

pub struct ListResourcesUseCase<R: ResourceRepository> {
    pub repo: R,
}

impl<R: ResourceRepository> ListResourcesUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<Resource>, ResourcesServiceError> {
        self.repo.list(LIST_LIMIT).await
    }
}

// ── UpdateResource ───────────────────────────────────────────────────────────

pub struct UpdateResourceInput {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
}

pub struct UpdateResourceUseCase<R: ResourceRepository> {
    pub repo: R,
}

impl<R: ResourceRepository> UpdateResourceUseCase<R> {
    pub async fn execute(
        &self,
        input: UpdateResourceInput,
    ) -> Result<Resource, ResourcesServiceError> {
        let update = ResourceUpdate {
            id: input.id,
            name: input.name,
            description: input.description,
            status: input.status,
            updated_at: Utc::now(),
        };
        let event = OutboxEvent::json(update.id, RESOURCE_UPDATED, &update.changed_event())?;

        let resource = self
            .repo
            .update_with_outbox(&update, &event)
            .await?
            .ok_or(ResourcesServiceError::ResourceNotFound)?;
        info!(resource_id = %resource.id, event_id = %event.id, "resource updated");
        Ok(resource)
    }
}

// ── DeleteResource ───────────────────────────────────────────────────────────

pub struct DeleteResourceUseCase<R: ResourceRepository> {
    pub repo: R,
}

impl<R: ResourceRepository> DeleteResourceUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<(), ResourcesServiceError> {
        let event = OutboxEvent::json(id, RESOURCE_DELETED, &deleted_event(id))?;

        if !self.repo.delete_with_outbox(id, &event).await? {
            return Err(ResourcesServiceError::ResourceNotFound);
        }
        info!(resource_id = %id, event_id = %event.id, "resource deleted");
        Ok(())
    }
}
