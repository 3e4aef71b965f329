use std::future::Future;

use conveyor_domain::id::TaskId;

use crate::domain::types::{Applied, ProcessedTask, TaskTransition};
use crate::error::TasksServiceError;

/// Repository for processed tasks and the inbox of applied event ids.
///
/// Futures are `Send` because the processor runs inside spawned dispatcher
/// handlers.
pub trait TaskRepository: Send + Sync {
    fn find(
        &self,
        id: TaskId,
    ) -> impl Future<Output = Result<Option<ProcessedTask>, TasksServiceError>> + Send;

    /// Newest first by creation time.
    fn list(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<ProcessedTask>, TasksServiceError>> + Send;

    /// Insert the task as `processing` if it does not exist yet. Never
    /// touches an existing row.
    fn ensure_processing(
        &self,
        transition: &TaskTransition,
    ) -> impl Future<Output = Result<(), TasksServiceError>> + Send;

    /// In one transaction: record `transition.event_id` in the inbox and,
    /// unless it was already there, write the terminal status and append
    /// `transition.completion`.
    ///
    /// Event ids are time-ordered. The terminal write only lands when the
    /// task's `last_event_id` is unset or older, so an event redelivered
    /// after a newer one reports [`Applied::Superseded`].
    fn apply(
        &self,
        transition: &TaskTransition,
    ) -> impl Future<Output = Result<Applied, TasksServiceError>> + Send;
}
