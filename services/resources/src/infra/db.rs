use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use conveyor_outbox::{OutboxEvent, append_event};
use conveyor_resources_schema::resources;

use crate::domain::repository::ResourceRepository;
use crate::domain::types::{Resource, ResourceUpdate};
use crate::error::ResourcesServiceError;

#[derive(Clone)]
pub struct DbResourceRepository {
    pub db: DatabaseConnection,
}

impl ResourceRepository for DbResourceRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Resource>, ResourcesServiceError> {
        let model = resources::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find resource")?;
        Ok(model.map(resource_from_model))
    }

    async fn list(&self, limit: u64) -> Result<Vec<Resource>, ResourcesServiceError> {
        let models = resources::Entity::find()
            .order_by_desc(resources::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list resources")?;
        Ok(models.into_iter().map(resource_from_model).collect())
    }

    async fn create_with_outbox(
        &self,
        resource: &Resource,
        event: &OutboxEvent,
    ) -> Result<(), ResourcesServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let resource = resource.clone();
                let event = event.clone();
                Box::pin(async move {
                    insert_resource(txn, &resource).await?;
                    append_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await
            .context("create resource with outbox")?;
        Ok(())
    }

    async fn update_with_outbox(
        &self,
        update: &ResourceUpdate,
        event: &OutboxEvent,
    ) -> Result<Option<Resource>, ResourcesServiceError> {
        let updated = self
            .db
            .transaction::<_, Option<Resource>, sea_orm::DbErr>(|txn| {
                let update = update.clone();
                let event = event.clone();
                Box::pin(async move {
                    let Some(existing) = resources::Entity::find_by_id(update.id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                    else {
                        return Ok(None);
                    };
                    let mut active: resources::ActiveModel = existing.into();
                    active.name = Set(update.name);
                    active.description = Set(update.description);
                    active.status = Set(update.status);
                    active.updated_at = Set(update.updated_at);
                    let model = active.update(txn).await?;
                    append_event(txn, &event).await?;
                    Ok(Some(resource_from_model(model)))
                })
            })
            .await
            .context("update resource with outbox")?;
        Ok(updated)
    }

    async fn delete_with_outbox(
        &self,
        id: Uuid,
        event: &OutboxEvent,
    ) -> Result<bool, ResourcesServiceError> {
        let deleted = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                let event = event.clone();
                Box::pin(async move {
                    let result = resources::Entity::delete_by_id(id).exec(txn).await?;
                    if result.rows_affected == 0 {
                        return Ok(false);
                    }
                    append_event(txn, &event).await?;
                    Ok(true)
                })
            })
            .await
            .context("delete resource with outbox")?;
        Ok(deleted)
    }
}

async fn insert_resource(
    txn: &DatabaseTransaction,
    resource: &Resource,
) -> Result<(), sea_orm::DbErr> {
    resources::ActiveModel {
        id: Set(resource.id),
        name: Set(resource.name.clone()),
        description: Set(resource.description.clone()),
        status: Set(resource.status.clone()),
        created_at: Set(resource.created_at),
        updated_at: Set(resource.updated_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn resource_from_model(model: resources::Model) -> Resource {
    Resource {
        id: model.id,
        name: model.name,
        description: model.description,
        status: model.status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
