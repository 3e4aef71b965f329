use std::future::Future;

use crate::domain::types::{AuditRecord, Recorded};
use crate::error::AuditServiceError;

pub trait AuditRepository: Send + Sync {
    /// Insert the record unless its event id is already present.
    fn record(
        &self,
        record: &AuditRecord,
    ) -> impl Future<Output = Result<Recorded, AuditServiceError>> + Send;

    /// Most recently processed first.
    fn list(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<AuditRecord>, AuditServiceError>> + Send;
}
