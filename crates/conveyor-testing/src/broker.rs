use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use conveyor_broker::{Broker, BrokerError, Delivery, OutboundMessage, Publisher, Subscriber};

/// How long an idle fetch waits for a publish before returning `None`.
const FETCH_WAIT: Duration = Duration::from_millis(50);

/// Broker held in process memory.
///
/// Each topic is an append-only log. Each group keeps one read cursor per
/// topic shared by its members, plus the set of delivered but uncommitted
/// entries and who holds them.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, Vec<OutboundMessage>>,
    groups: HashMap<String, GroupState>,
    fail_publishes: usize,
    publish_attempts: usize,
}

#[derive(Default)]
struct GroupState {
    cursors: HashMap<String, usize>,
    /// (topic, index) -> consumer holding it.
    pending: BTreeMap<(String, usize), String>,
    committed: Vec<(String, usize)>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` publishes with [`BrokerError::Unavailable`].
    pub fn fail_next_publishes(&self, n: usize) {
        self.state.lock().unwrap().fail_publishes = n;
    }

    /// Every message accepted on `topic`, in order.
    pub fn published(&self, topic: &str) -> Vec<OutboundMessage> {
        self.state
            .lock()
            .unwrap()
            .topics
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub fn published_count(&self) -> usize {
        self.state.lock().unwrap().topics.values().map(Vec::len).sum()
    }

    /// Publish calls seen, failed ones included.
    pub fn publish_attempts(&self) -> usize {
        self.state.lock().unwrap().publish_attempts
    }

    /// Offsets `group` has committed on `topic`.
    pub fn committed(&self, group: &str, topic: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .get(group)
            .map(|g| {
                g.committed
                    .iter()
                    .filter(|(t, _)| t == topic)
                    .map(|(_, idx)| idx.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Delivered but uncommitted entries in `group`.
    pub fn pending(&self, group: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.groups.get(group).map_or(0, |g| g.pending.len())
    }
}

impl Publisher for InMemoryBroker {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock().unwrap();
            state.publish_attempts += 1;
            if state.fail_publishes > 0 {
                state.fail_publishes -= 1;
                return Err(BrokerError::Unavailable("injected publish failure".into()));
            }
            state
                .topics
                .entry(message.topic.clone())
                .or_default()
                .push(message.clone());
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

impl Broker for InMemoryBroker {
    type Subscriber = InMemorySubscriber;

    /// Subscribing again under a consumer name that still holds uncommitted
    /// entries hands those entries out first, like a restarted process.
    async fn subscribe(
        &self,
        group: &str,
        consumer: &str,
        topics: &[String],
    ) -> Result<InMemorySubscriber, BrokerError> {
        let mut state = self.state.lock().unwrap();
        let group_state = state.groups.entry(group.to_owned()).or_default();
        let recovery = group_state
            .pending
            .iter()
            .filter(|((topic, _), holder)| *holder == consumer && topics.contains(topic))
            .map(|(entry, _)| entry.clone())
            .collect();
        Ok(InMemorySubscriber {
            broker: self.clone(),
            group: group.to_owned(),
            consumer: consumer.to_owned(),
            topics: topics.to_vec(),
            recovery,
        })
    }
}

pub struct InMemorySubscriber {
    broker: InMemoryBroker,
    group: String,
    consumer: String,
    topics: Vec<String>,
    recovery: VecDeque<(String, usize)>,
}

impl InMemorySubscriber {
    fn delivery(topic: &str, index: usize, message: &OutboundMessage, redelivered: bool) -> Delivery {
        Delivery {
            topic: topic.to_owned(),
            key: message.key.clone(),
            payload: message.payload.clone(),
            headers: message.headers.clone(),
            offset: index.to_string(),
            redelivered,
        }
    }

    fn try_next(&mut self) -> Option<Delivery> {
        let mut guard = self.broker.state.lock().unwrap();
        let state = &mut *guard;

        while let Some((topic, index)) = self.recovery.pop_front() {
            let group = state.groups.get(&self.group)?;
            if !group.pending.contains_key(&(topic.clone(), index)) {
                continue;
            }
            let message = state.topics.get(&topic).and_then(|log| log.get(index))?;
            return Some(Self::delivery(&topic, index, message, true));
        }

        let group = state.groups.entry(self.group.clone()).or_default();
        for topic in &self.topics {
            let Some(log) = state.topics.get(topic) else {
                continue;
            };
            let cursor = group.cursors.entry(topic.clone()).or_insert(0);
            if let Some(message) = log.get(*cursor) {
                let index = *cursor;
                *cursor += 1;
                group
                    .pending
                    .insert((topic.clone(), index), self.consumer.clone());
                return Some(Self::delivery(topic, index, message, false));
            }
        }
        None
    }
}

impl Subscriber for InMemorySubscriber {
    async fn fetch(&mut self) -> Result<Option<Delivery>, BrokerError> {
        let notify = self.broker.notify.clone();
        let published = notify.notified();
        if let Some(delivery) = self.try_next() {
            return Ok(Some(delivery));
        }
        let _ = tokio::time::timeout(FETCH_WAIT, published).await;
        Ok(self.try_next())
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError> {
        let index: usize = delivery
            .offset
            .parse()
            .map_err(|_| BrokerError::Malformed(format!("offset {}", delivery.offset)))?;
        let mut state = self.broker.state.lock().unwrap();
        let group = state.groups.entry(self.group.clone()).or_default();
        if group.pending.remove(&(delivery.topic.clone(), index)).is_some() {
            group.committed.push((delivery.topic.clone(), index));
        }
        Ok(())
    }
}
