use chrono::{DateTime, Utc};

use conveyor_domain::id::EventId;

/// A flattened, queryable copy of one consumed event.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub event_id: EventId,
    pub event_type: String,
    pub resource_id: String,
    /// Set for `task.completed` only.
    pub task_id: Option<String>,
    /// `created`/`updated`/`deleted` for resource events, the task action otherwise.
    pub action: String,
    pub payload: serde_json::Value,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Recorded,
    /// The event id already has a row; nothing was written.
    Duplicate,
}
