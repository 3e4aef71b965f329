use anyhow::Context;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, EntityTrait, Insert, QueryOrder, QuerySelect,
    sea_query::OnConflict,
};

use conveyor_audit_schema::audit_events;
use conveyor_domain::id::EventId;

use crate::domain::repository::AuditRepository;
use crate::domain::types::{AuditRecord, Recorded};
use crate::error::AuditServiceError;

#[derive(Clone)]
pub struct DbAuditRepository {
    pub db: DatabaseConnection,
}

impl AuditRepository for DbAuditRepository {
    async fn record(&self, record: &AuditRecord) -> Result<Recorded, AuditServiceError> {
        let inserted = audit_insert(record)
            .exec_without_returning(&self.db)
            .await
            .context("record audit event")?;
        Ok(if inserted == 0 {
            Recorded::Duplicate
        } else {
            Recorded::Recorded
        })
    }

    async fn list(&self, limit: u64) -> Result<Vec<AuditRecord>, AuditServiceError> {
        let models = audit_events::Entity::find()
            .order_by_desc(audit_events::Column::ProcessedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list audit events")?;
        Ok(models.into_iter().map(record_from_model).collect())
    }
}

/// Affects zero rows when the event id is already recorded.
fn audit_insert(record: &AuditRecord) -> Insert<audit_events::ActiveModel> {
    audit_events::Entity::insert(audit_events::ActiveModel {
        event_id: Set(record.event_id.0),
        event_type: Set(record.event_type.clone()),
        resource_id: Set(record.resource_id.clone()),
        task_id: Set(record.task_id.clone()),
        action: Set(record.action.clone()),
        payload: Set(record.payload.clone()),
        processed_at: Set(record.processed_at),
    })
    .on_conflict(
        OnConflict::column(audit_events::Column::EventId)
            .do_nothing()
            .to_owned(),
    )
}

fn record_from_model(m: audit_events::Model) -> AuditRecord {
    AuditRecord {
        event_id: EventId(m.event_id),
        event_type: m.event_type,
        resource_id: m.resource_id,
        task_id: m.task_id,
        action: m.action,
        payload: m.payload,
        processed_at: m.processed_at,
    }
}
