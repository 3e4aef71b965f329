use chrono::{DateTime, Utc};
use uuid::Uuid;

use conveyor_domain::event::{ResourceChanged, ResourceDeleted};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DELETED: &str = "deleted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full replacement of a resource's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUpdate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn changed_event(&self) -> ResourceChanged {
        ResourceChanged {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
        }
    }
}

impl ResourceUpdate {
    pub fn changed_event(&self) -> ResourceChanged {
        ResourceChanged {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
        }
    }
}

pub fn deleted_event(id: Uuid) -> ResourceDeleted {
    ResourceDeleted {
        id: id.to_string(),
        status: STATUS_DELETED.to_owned(),
    }
}
