use chrono::Utc;
use tracing::{debug, info};

use conveyor_domain::event::DomainEvent;
use conveyor_domain::id::EventId;

use crate::domain::repository::AuditRepository;
use crate::domain::types::{AuditRecord, Recorded};
use crate::error::AuditServiceError;

pub struct RecordEventUseCase<R: AuditRepository> {
    pub repo: R,
}

impl<R: AuditRepository> RecordEventUseCase<R> {
    /// Store one consumed event. Redelivery of the same `event_id` reports
    /// [`Recorded::Duplicate`] and writes nothing.
    pub async fn execute(
        &self,
        event_id: EventId,
        event_type: &str,
        payload: &[u8],
    ) -> Result<Recorded, AuditServiceError> {
        let record = audit_record(event_id, event_type, payload)?;
        let recorded = self.repo.record(&record).await?;
        match recorded {
            Recorded::Recorded => info!(
                event_id = %event_id,
                event_type = %record.event_type,
                resource_id = %record.resource_id,
                action = %record.action,
                "event recorded"
            ),
            Recorded::Duplicate => debug!(event_id = %event_id, "event already recorded"),
        }
        Ok(recorded)
    }
}

/// Flatten a consumed event into its audit row.
pub fn audit_record(
    event_id: EventId,
    event_type: &str,
    payload: &[u8],
) -> Result<AuditRecord, AuditServiceError> {
    let event = DomainEvent::decode(event_type, payload)
        .map_err(|e| AuditServiceError::InvalidEvent(e.to_string()))?;

    let (resource_id, task_id, action) = match &event {
        DomainEvent::ResourceCreated(r) | DomainEvent::ResourceUpdated(r) => {
            (r.id.clone(), None, lifecycle_action(event_type))
        }
        DomainEvent::ResourceDeleted(r) => (r.id.clone(), None, lifecycle_action(event_type)),
        DomainEvent::TaskCompleted(t) => {
            if t.task_id.is_empty() || t.action.is_empty() {
                return Err(AuditServiceError::InvalidEvent(format!(
                    "{event_type} requires task_id, resource_id and action"
                )));
            }
            (t.resource_id.clone(), Some(t.task_id.clone()), t.action.clone())
        }
        DomainEvent::Unknown { .. } => {
            return Err(AuditServiceError::InvalidEvent(format!(
                "no audit mapping for {event_type}"
            )));
        }
    };
    if resource_id.is_empty() {
        return Err(AuditServiceError::InvalidEvent(format!(
            "{event_type} has no resource id"
        )));
    }

    let payload = serde_json::from_slice(payload)
        .map_err(|e| AuditServiceError::InvalidEvent(format!("payload is not JSON: {e}")))?;

    Ok(AuditRecord {
        event_id,
        event_type: event.event_type().to_owned(),
        resource_id,
        task_id,
        action,
        payload,
        processed_at: Utc::now(),
    })
}

/// `resource.created` → `created`.
fn lifecycle_action(event_type: &str) -> String {
    event_type
        .rsplit_once('.')
        .map_or(event_type, |(_, verb)| verb)
        .to_owned()
}
