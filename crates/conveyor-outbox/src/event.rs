use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, DatabaseTransaction, EntityTrait};
use serde::Serialize;

use conveyor_broker::OutboundMessage;
use conveyor_broker::message::{HEADER_EVENT_ID, HEADER_EVENT_TYPE, Headers};
use conveyor_domain::id::{AggregateId, EventId};

use crate::entity as outbox_events;
use crate::store::OutboxError;

/// A pending outbox record: written by a producer, read back by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEvent {
    pub id: EventId,
    /// Partition key on the broker.
    pub aggregate_id: AggregateId,
    /// Also the topic the relay publishes to.
    pub event_type: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn new(
        aggregate_id: impl Into<AggregateId>,
        event_type: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id: EventId::new(),
            aggregate_id: aggregate_id.into(),
            event_type: event_type.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize>(
        aggregate_id: impl Into<AggregateId>,
        event_type: impl Into<String>,
        body: &T,
    ) -> Result<Self, OutboxError> {
        let payload = serde_json::to_vec(body)?;
        Ok(Self::new(aggregate_id, event_type, payload))
    }

    pub fn to_message(&self) -> OutboundMessage {
        OutboundMessage {
            topic: self.event_type.clone(),
            key: self.aggregate_id.to_string(),
            payload: self.payload.clone(),
            headers: Headers::new()
                .with(HEADER_EVENT_ID, self.id.to_string())
                .with(HEADER_EVENT_TYPE, self.event_type.as_str()),
        }
    }
}

impl From<outbox_events::Model> for OutboxEvent {
    fn from(model: outbox_events::Model) -> Self {
        Self {
            id: EventId(model.id),
            aggregate_id: AggregateId(model.aggregate_id),
            event_type: model.event_type,
            payload: model.payload,
            created_at: model.created_at,
        }
    }
}

/// Insert `event` on the caller's transaction.
///
/// Never begins or commits: the row lands exactly when the caller's business
/// write does, and an error here should abort that transaction.
pub async fn append_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    outbox_events::Entity::insert(outbox_events::ActiveModel {
        id: Set(event.id.0),
        aggregate_id: Set(event.aggregate_id.to_string()),
        event_type: Set(event.event_type.clone()),
        payload: Set(event.payload.clone()),
        created_at: Set(event.created_at),
        published_at: Set(None),
    })
    .exec_without_returning(txn)
    .await?;
    Ok(())
}
