use crate::domain::repository::AuditRepository;
use crate::domain::types::AuditRecord;
use crate::error::AuditServiceError;

/// Page size for `GET /events` when none (or zero) is given.
pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 500;

pub struct ListAuditEventsUseCase<R: AuditRepository> {
    pub repo: R,
}

impl<R: AuditRepository> ListAuditEventsUseCase<R> {
    pub async fn execute(&self, limit: Option<u64>) -> Result<Vec<AuditRecord>, AuditServiceError> {
        let limit = match limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(n) => n.min(MAX_LIMIT),
        };
        self.repo.list(limit).await
    }
}
