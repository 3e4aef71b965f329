use crate::error::BrokerError;
use crate::message::{Delivery, OutboundMessage};

/// Publishing half of the broker contract.
pub trait Publisher: Send + Sync {
    /// Resolves once the broker has durably accepted the message.
    async fn publish(&self, message: &OutboundMessage) -> Result<(), BrokerError>;
}

/// A consumer-group member reading a fixed set of topics.
///
/// Offsets are never committed implicitly: a fetched message stays pending
/// until [`Subscriber::commit`] is called for it.
pub trait Subscriber: Send {
    /// Next message, or `None` when nothing arrived within the fetch window.
    async fn fetch(&mut self) -> Result<Option<Delivery>, BrokerError>;

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError>;
}

pub trait Broker: Publisher {
    type Subscriber: Subscriber;

    /// Join `group` as `consumer` over `topics`. Distinct groups each see the
    /// full stream; members of one group share it.
    async fn subscribe(
        &self,
        group: &str,
        consumer: &str,
        topics: &[String],
    ) -> Result<Self::Subscriber, BrokerError>;
}
