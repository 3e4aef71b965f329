use chrono::{DateTime, Utc};

use conveyor_domain::event::DomainEvent;
use conveyor_domain::id::{EventId, TaskId};
use conveyor_domain::task::{TaskAction, TaskStatus};
use conveyor_outbox::OutboxEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedTask {
    pub id: TaskId,
    pub resource_id: String,
    pub action: String,
    pub status: TaskStatus,
    /// Set on the terminal transition.
    pub result: Option<String>,
    pub last_event_id: Option<EventId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything one inbound event writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTransition {
    pub task_id: TaskId,
    pub resource_id: String,
    pub action: TaskAction,
    pub event_id: EventId,
    pub event_type: String,
    /// Terminal status the task moves to.
    pub status: TaskStatus,
    pub result: String,
    /// `task.completed` to append with the transition, when completed.
    pub completion: Option<OutboxEvent>,
    pub at: DateTime<Utc>,
}

/// What [`TaskTransition`] did to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The event id was already in the inbox; nothing written.
    Duplicate,
    /// The task already reflects a newer event. The event id is recorded
    /// but the task and outbox are left alone.
    Superseded,
}

/// Terminal status and result for `event`. Pure: the same event always
/// yields the same outcome.
pub fn outcome(action: TaskAction, resource_id: &str, event: &DomainEvent) -> (TaskStatus, String) {
    match event {
        DomainEvent::ResourceCreated(r) | DomainEvent::ResourceUpdated(r)
            if r.name.trim().is_empty() =>
        {
            (
                TaskStatus::Failed,
                "resource name must not be empty".to_owned(),
            )
        }
        _ => (
            TaskStatus::Completed,
            format!("Completed {action} for resource {resource_id}"),
        ),
    }
}
