use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::event::{RESOURCE_CREATED, RESOURCE_DELETED, RESOURCE_UPDATED};

/// Lifecycle of a processed task. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownTaskStatus(other.to_owned())),
        }
    }
}

/// Logical action a resource event asks the task processor to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    ProcessNewResource,
    ReprocessResource,
    CleanupResource,
}

impl TaskAction {
    pub fn for_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            RESOURCE_CREATED => Some(Self::ProcessNewResource),
            RESOURCE_UPDATED => Some(Self::ReprocessResource),
            RESOURCE_DELETED => Some(Self::CleanupResource),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessNewResource => "process_new_resource",
            Self::ReprocessResource => "reprocess_resource",
            Self::CleanupResource => "cleanup_resource",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
