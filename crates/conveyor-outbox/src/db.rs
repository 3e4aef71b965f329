use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait, UpdateMany,
};
use tracing::debug;

use conveyor_core::sea_ext::ForUpdateSkipLocked;
use conveyor_domain::id::EventId;

use crate::entity as outbox_events;
use crate::event::OutboxEvent;
use crate::store::{ClaimedBatch, OutboxError, OutboxStore};

/// Postgres-backed outbox store.
///
/// A claim is a `SELECT ... FOR UPDATE SKIP LOCKED` on a transaction owned by
/// the returned batch; marks run on that same transaction.
///
/// The transaction stays open while the relay publishes the batch. Its row
/// locks are the claim: committing them away after the `SELECT` would let a
/// second relay pick the same rows before they are marked. Holding them costs
/// one pooled connection per relay for at most `batch size x publish timeout`
/// (see `RelayConfig::relay_publish_timeout_ms`), and a crash mid-batch only
/// rolls the marks back, which turns into a republish rather than a loss.
#[derive(Clone)]
pub struct DbOutboxStore {
    pub db: DatabaseConnection,
}

pub struct DbClaimedBatch {
    txn: DatabaseTransaction,
    records: Vec<OutboxEvent>,
}

impl OutboxStore for DbOutboxStore {
    type Batch = DbClaimedBatch;

    async fn claim_pending(&self, relay_id: &str, limit: u64) -> Result<DbClaimedBatch, OutboxError> {
        let txn = self.db.begin().await.context("begin outbox claim")?;
        let models = pending_query(limit)
            .all(&txn)
            .await
            .context("claim pending outbox events")?;
        debug!(relay_id, claimed = models.len(), "outbox rows claimed");
        Ok(DbClaimedBatch {
            txn,
            records: models.into_iter().map(OutboxEvent::from).collect(),
        })
    }

    async fn pending_count(&self) -> Result<u64, OutboxError> {
        let count = outbox_events::Entity::find()
            .filter(outbox_events::Column::PublishedAt.is_null())
            .count(&self.db)
            .await
            .context("count pending outbox events")?;
        Ok(count)
    }
}

impl ClaimedBatch for DbClaimedBatch {
    fn records(&self) -> &[OutboxEvent] {
        &self.records
    }

    async fn mark_published(&mut self, id: EventId) -> Result<bool, OutboxError> {
        let result = mark_published_statement(id, Utc::now())
            .exec(&self.txn)
            .await
            .context("mark outbox event published")?;
        Ok(result.rows_affected == 1)
    }

    async fn finish(self) -> Result<(), OutboxError> {
        self.txn.commit().await.context("commit outbox claim")?;
        Ok(())
    }
}

fn pending_query(limit: u64) -> Select<outbox_events::Entity> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::PublishedAt.is_null())
        .order_by_asc(outbox_events::Column::CreatedAt)
        .order_by_asc(outbox_events::Column::Id)
        .limit(limit)
        .for_update_skip_locked()
}

fn mark_published_statement(id: EventId, at: DateTime<Utc>) -> UpdateMany<outbox_events::Entity> {
    outbox_events::Entity::update_many()
        .col_expr(outbox_events::Column::PublishedAt, Expr::value(at))
        .filter(outbox_events::Column::Id.eq(id.0))
        .filter(outbox_events::Column::PublishedAt.is_null())
}
