use std::collections::BTreeMap;

/// Header carrying the outbox record id; consumers deduplicate on it.
pub const HEADER_EVENT_ID: &str = "event_id";
/// Header carrying the outbox `event_type` (also the topic).
pub const HEADER_EVENT_TYPE: &str = "event_type";
/// Added to dead-lettered messages: why processing gave up.
pub const HEADER_ERROR: &str = "error";
/// Added to dead-lettered messages: topic the message was consumed from.
pub const HEADER_ORIGINAL_TOPIC: &str = "original_topic";

/// String headers attached to a message. Ordered for stable encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A message handed to the broker for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    /// Partition key. Order is preserved among messages sharing a key.
    pub key: String,
    /// Opaque producer-defined bytes.
    pub payload: Vec<u8>,
    pub headers: Headers,
}

/// A message fetched from the broker, committable via its `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: Headers,
    /// Broker-specific position used to commit.
    pub offset: String,
    /// `true` when the broker knows this message was handed out before.
    pub redelivered: bool,
}

impl Delivery {
    pub fn event_id(&self) -> Option<&str> {
        self.headers.get(HEADER_EVENT_ID)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.headers.get(HEADER_EVENT_TYPE)
    }
}
