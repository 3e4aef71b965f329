//! Event type registry and typed payload decoding.
//!
//! Payloads travel as opaque JSON bytes. Consumers decode them here into a
//! closed set of variants keyed by `event_type`; anything unrecognized becomes
//! [`DomainEvent::Unknown`] instead of being guessed at.

use serde::{Deserialize, Serialize};

pub const RESOURCE_CREATED: &str = "resource.created";
pub const RESOURCE_UPDATED: &str = "resource.updated";
pub const RESOURCE_DELETED: &str = "resource.deleted";
pub const TASK_COMPLETED: &str = "task.completed";

/// Topics carrying resource lifecycle events.
pub const RESOURCE_TOPICS: [&str; 3] = [RESOURCE_CREATED, RESOURCE_UPDATED, RESOURCE_DELETED];

/// Payload of `resource.created` and `resource.updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChanged {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
}

/// Payload of `resource.deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeleted {
    pub id: String,
    #[serde(default = "deleted_status")]
    pub status: String,
}

fn deleted_status() -> String {
    "deleted".to_owned()
}

/// Payload of `task.completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub task_id: String,
    pub resource_id: String,
    pub action: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    ResourceCreated(ResourceChanged),
    ResourceUpdated(ResourceChanged),
    ResourceDeleted(ResourceDeleted),
    TaskCompleted(TaskCompleted),
    Unknown { event_type: String },
}

#[derive(Debug, thiserror::Error)]
#[error("malformed {event_type} payload: {source}")]
pub struct DecodeError {
    pub event_type: String,
    #[source]
    pub source: serde_json::Error,
}

impl DomainEvent {
    /// Decode `payload` according to `event_type`.
    ///
    /// An unregistered type is not an error; a registered type whose payload
    /// does not match its schema is.
    pub fn decode(event_type: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        let malformed = |source| DecodeError {
            event_type: event_type.to_owned(),
            source,
        };
        let event = match event_type {
            RESOURCE_CREATED => {
                Self::ResourceCreated(serde_json::from_slice(payload).map_err(malformed)?)
            }
            RESOURCE_UPDATED => {
                Self::ResourceUpdated(serde_json::from_slice(payload).map_err(malformed)?)
            }
            RESOURCE_DELETED => {
                Self::ResourceDeleted(serde_json::from_slice(payload).map_err(malformed)?)
            }
            TASK_COMPLETED => {
                Self::TaskCompleted(serde_json::from_slice(payload).map_err(malformed)?)
            }
            other => Self::Unknown {
                event_type: other.to_owned(),
            },
        };
        Ok(event)
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::ResourceCreated(_) => RESOURCE_CREATED,
            Self::ResourceUpdated(_) => RESOURCE_UPDATED,
            Self::ResourceDeleted(_) => RESOURCE_DELETED,
            Self::TaskCompleted(_) => TASK_COMPLETED,
            Self::Unknown { event_type } => event_type,
        }
    }

    /// Identity of the entity the event is about, if the variant carries one.
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            Self::ResourceCreated(r) | Self::ResourceUpdated(r) => Some(&r.id),
            Self::ResourceDeleted(r) => Some(&r.id),
            Self::TaskCompleted(t) => Some(&t.task_id),
            Self::Unknown { .. } => None,
        }
    }
}
