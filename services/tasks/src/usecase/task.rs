use conveyor_domain::id::TaskId;

use crate::domain::repository::TaskRepository;
use crate::domain::types::ProcessedTask;
use crate::error::TasksServiceError;

/// Page size for `GET /tasks` when none (or zero) is given.
pub const DEFAULT_PAGE_SIZE: u64 = 50;
/// Upper bound for `GET /tasks?page_size=`.
pub const MAX_PAGE_SIZE: u64 = 500;

// ── GetTask ──────────────────────────────────────────────────────────────────

pub struct GetTaskUseCase<R: TaskRepository> {
    pub repo: R,
}

impl<R: TaskRepository> GetTaskUseCase<R> {
    pub async fn execute(&self, id: TaskId) -> Result<ProcessedTask, TasksServiceError> {
        self.repo
            .find(id)
            .await?
            .ok_or(TasksServiceError::TaskNotFound)
    }
}

// ── ListTasks ────────────────────────────────────────────────────────────────

pub struct ListTasksUseCase<R: TaskRepository> {
    pub repo: R,
}

impl<R: TaskRepository> ListTasksUseCase<R> {
    pub async fn execute(
        &self,
        page_size: Option<u64>,
    ) -> Result<Vec<ProcessedTask>, TasksServiceError> {
        self.repo.list(effective_page_size(page_size)).await
    }
}

fn effective_page_size(requested: Option<u64>) -> u64 {
    match requested {
        None | Some(0) => DEFAULT_PAGE_SIZE,
        Some(n) => n.min(MAX_PAGE_SIZE),
    }
}
