use chrono::Utc;
use tracing::{debug, info};

use conveyor_domain::event::{DomainEvent, TASK_COMPLETED, TaskCompleted};
use conveyor_domain::id::{AggregateId, EventId, TaskId};
use conveyor_domain::task::{TaskAction, TaskStatus};
use conveyor_outbox::OutboxEvent;

use crate::domain::repository::TaskRepository;
use crate::domain::types::{Applied, TaskTransition, outcome};
use crate::error::TasksServiceError;

/// Result of handing one delivery to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processed {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub applied: Applied,
}

pub struct ProcessEventUseCase<R: TaskRepository> {
    pub repo: R,
}

impl<R: TaskRepository> ProcessEventUseCase<R> {
    /// Apply one resource event to its task.
    ///
    /// Safe to call any number of times for the same `event_id`: only the
    /// first call writes, later ones report [`Applied::Duplicate`].
    pub async fn execute(
        &self,
        event_id: EventId,
        event_type: &str,
        payload: &[u8],
    ) -> Result<Processed, TasksServiceError> {
        let transition = plan(event_id, event_type, payload)?;

        self.repo.ensure_processing(&transition).await?;
        let applied = self.repo.apply(&transition).await?;

        match applied {
            Applied::Applied => info!(
                task_id = %transition.task_id,
                event_id = %event_id,
                status = %transition.status,
                "task transitioned"
            ),
            Applied::Duplicate => debug!(
                task_id = %transition.task_id,
                event_id = %event_id,
                "event already applied"
            ),
            Applied::Superseded => info!(
                task_id = %transition.task_id,
                event_id = %event_id,
                "task already reflects a newer event"
            ),
        }
        Ok(Processed {
            task_id: transition.task_id,
            status: transition.status,
            applied,
        })
    }
}

/// Decode the event and compute the transition it causes.
pub fn plan(
    event_id: EventId,
    event_type: &str,
    payload: &[u8],
) -> Result<TaskTransition, TasksServiceError> {
    let event = DomainEvent::decode(event_type, payload)
        .map_err(|e| TasksServiceError::InvalidEvent(e.to_string()))?;
    let action = TaskAction::for_event_type(event.event_type())
        .ok_or_else(|| TasksServiceError::InvalidEvent(format!("no task for {event_type}")))?;
    let resource_id = event
        .subject_id()
        .ok_or_else(|| TasksServiceError::InvalidEvent(format!("{event_type} has no subject")))?
        .to_owned();

    let task_id = TaskId::derive(&AggregateId::from(resource_id.as_str()), event_type);
    let (status, result) = outcome(action, &resource_id, &event);

    let completion = match status {
        TaskStatus::Completed => Some(OutboxEvent::json(
            task_id.0,
            TASK_COMPLETED,
            &TaskCompleted {
                task_id: task_id.to_string(),
                resource_id: resource_id.clone(),
                action: action.as_str().to_owned(),
                status: status.as_str().to_owned(),
            },
        )?),
        _ => None,
    };

    Ok(TaskTransition {
        task_id,
        resource_id,
        action,
        event_id,
        event_type: event_type.to_owned(),
        status,
        result,
        completion,
        at: Utc::now(),
    })
}
