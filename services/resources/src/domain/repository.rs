#![allow(async_fn_in_trait)]

use uuid::Uuid;

use conveyor_outbox::OutboxEvent;

use crate::domain::types::{Resource, ResourceUpdate};
use crate::error::ResourcesServiceError;

/// Repository for resources. Every write also appends its outbox event in
/// the same transaction; a write that changes nothing appends nothing.
pub trait ResourceRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Resource>, ResourcesServiceError>;

    /// Newest first, at most `limit`.
    async fn list(&self, limit: u64) -> Result<Vec<Resource>, ResourcesServiceError>;

    async fn create_with_outbox(
        &self,
        resource: &Resource,
        event: &OutboxEvent,
    ) -> Result<(), ResourcesServiceError>;

    /// Returns the updated row, or `None` if `update.id` does not exist.
    async fn update_with_outbox(
        &self,
        update: &ResourceUpdate,
        event: &OutboxEvent,
    ) -> Result<Option<Resource>, ResourcesServiceError>;

    /// Returns `false` if the resource did not exist.
    async fn delete_with_outbox(
        &self,
        id: Uuid,
        event: &OutboxEvent,
    ) -> Result<bool, ResourcesServiceError>;
}
