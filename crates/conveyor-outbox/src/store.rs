use conveyor_domain::id::EventId;

use crate::event::OutboxEvent;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("outbox store failure: {0:#}")]
    Store(#[from] anyhow::Error),
    #[error("failed to encode outbox payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Source of pending outbox records for the relay.
pub trait OutboxStore: Send + Sync {
    type Batch: ClaimedBatch;

    /// Claim up to `limit` of the oldest pending records.
    ///
    /// Concurrent claims never return the same record while either batch is
    /// alive. The claim is not durable: it ends with the batch.
    async fn claim_pending(&self, relay_id: &str, limit: u64) -> Result<Self::Batch, OutboxError>;

    async fn pending_count(&self) -> Result<u64, OutboxError>;
}

/// Records held by one relay cycle.
///
/// Marks become visible on [`ClaimedBatch::finish`]. Dropping the batch
/// without finishing releases the claim and discards the marks, so those
/// records are published again later.
pub trait ClaimedBatch: Send {
    /// Oldest first.
    fn records(&self) -> &[OutboxEvent];

    /// Set `published_at` if still null. `false` means it was already set.
    async fn mark_published(&mut self, id: EventId) -> Result<bool, OutboxError>;

    async fn finish(self) -> Result<(), OutboxError>;
}
