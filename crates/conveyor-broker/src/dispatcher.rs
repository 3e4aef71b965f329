//! Consumer dispatcher: fetch, route to a handler, commit only on success.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use conveyor_core::backoff::Backoff;
use conveyor_core::config::Config;
use conveyor_core::shutdown::Shutdown;

use crate::error::BrokerError;
use crate::message::{Delivery, HEADER_ERROR, HEADER_ORIGINAL_TOPIC, OutboundMessage};
use crate::port::{Broker, Publisher, Subscriber};

/// Why a handler did not finish a delivery.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Worth retrying: the store or a downstream was unavailable.
    #[error("transient handler failure: {0:#}")]
    Transient(anyhow::Error),
    /// Retrying cannot help, e.g. an undecodable payload.
    #[error("permanent handler failure: {0:#}")]
    Permanent(anyhow::Error),
}

impl HandlerError {
    pub fn transient(e: impl Into<anyhow::Error>) -> Self {
        Self::Transient(e.into())
    }

    pub fn permanent(e: impl Into<anyhow::Error>) -> Self {
        Self::Permanent(e.into())
    }
}

/// Processes one delivery. Must be idempotent: a delivery can arrive again
/// after the handler already succeeded but before the commit landed.
pub trait Handler: Send + Sync {
    fn handle(&self, delivery: Delivery) -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Delivery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, delivery: Delivery) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin(self(delivery))
    }
}

/// What happens to a delivery that fails permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoisonPolicy {
    /// Republish to `{topic}{dead_letter_suffix}` with an `error` header, then commit.
    #[default]
    DeadLetter,
    /// Log and commit.
    SkipAndCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Consumer role. Env var: `CONSUMER_GROUP`.
    pub consumer_group: String,
    /// Member name within the group (default `$HOSTNAME`). Env var: `CONSUMER_NAME`.
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,
    #[serde(default = "default_max_attempts")]
    pub dispatch_max_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub dispatch_retry_base_ms: u64,
    #[serde(default = "default_retry_max_ms")]
    pub dispatch_retry_max_ms: u64,
    #[serde(default)]
    pub poison_policy: PoisonPolicy,
    #[serde(default = "default_dead_letter_suffix")]
    pub dead_letter_suffix: String,
}

fn default_consumer_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "conveyor-consumer".to_owned())
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    200
}

fn default_retry_max_ms() -> u64 {
    5_000
}

fn default_dead_letter_suffix() -> String {
    ".dlq".to_owned()
}

impl Config for DispatcherConfig {}

impl DispatcherConfig {
    pub fn new(consumer_group: impl Into<String>) -> Self {
        Self {
            consumer_group: consumer_group.into(),
            consumer_name: default_consumer_name(),
            dispatch_max_attempts: default_max_attempts(),
            dispatch_retry_base_ms: default_retry_base_ms(),
            dispatch_retry_max_ms: default_retry_max_ms(),
            poison_policy: PoisonPolicy::default(),
            dead_letter_suffix: default_dead_letter_suffix(),
        }
    }

    fn retry_backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.dispatch_retry_base_ms),
            Duration::from_millis(self.dispatch_retry_max_ms),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] BrokerError),
    #[error("commit failed for {offset}: {source}")]
    Commit {
        offset: String,
        #[source]
        source: BrokerError,
    },
    #[error("dead-letter publish failed for {offset}: {source}")]
    DeadLetter {
        offset: String,
        #[source]
        source: BrokerError,
    },
}

/// Outcome of one dispatch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Nothing arrived within the fetch window.
    Idle,
    Committed { offset: String },
    /// Transient failures exhausted the retry budget; left uncommitted.
    Retained { offset: String },
    DeadLettered { offset: String, dead_letter_topic: String },
    Skipped { offset: String },
}

pub struct Dispatcher<S, P> {
    subscriber: S,
    dead_letters: P,
    config: DispatcherConfig,
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl<S, P> Dispatcher<S, P>
where
    S: Subscriber,
    P: Publisher,
{
    pub fn new(subscriber: S, dead_letters: P, config: DispatcherConfig) -> Self {
        Self {
            subscriber,
            dead_letters,
            config,
            routes: HashMap::new(),
        }
    }

    /// Register `handler` for `topic`. A later route for the same topic replaces it.
    pub fn route(mut self, topic: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.routes.insert(topic.into(), Arc::new(handler));
        self
    }

    /// Like [`Dispatcher::route`] for a handler shared across several topics.
    pub fn route_shared(mut self, topic: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.routes.insert(topic.into(), handler);
        self
    }

    /// Fetch one delivery and take it through handle and commit.
    pub async fn run_once(&mut self) -> Result<Dispatched, DispatchError> {
        match self.subscriber.fetch().await.map_err(DispatchError::Fetch)? {
            Some(delivery) => self.dispatch(delivery).await,
            None => Ok(Dispatched::Idle),
        }
    }

    /// Dispatch until `shutdown` fires. Only the fetch is abandoned on
    /// shutdown; a delivery already in hand is finished first.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        let mut fetch_backoff = self.config.retry_backoff();
        info!(
            group = %self.config.consumer_group,
            consumer = %self.config.consumer_name,
            topics = ?self.routes.keys().collect::<Vec<_>>(),
            "dispatcher started"
        );

        loop {
            let fetched = tokio::select! {
                _ = shutdown.triggered() => break,
                fetched = self.subscriber.fetch() => fetched,
            };

            let result = match fetched {
                Ok(Some(delivery)) => self.dispatch(delivery).await,
                Ok(None) => Ok(Dispatched::Idle),
                Err(e) => Err(DispatchError::Fetch(e)),
            };

            match result {
                Ok(_) => fetch_backoff.reset(),
                Err(e) => {
                    let delay = fetch_backoff.next_delay();
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "dispatch step failed");
                    tokio::select! {
                        _ = shutdown.triggered() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!(group = %self.config.consumer_group, "dispatcher stopped");
    }

    async fn dispatch(&mut self, delivery: Delivery) -> Result<Dispatched, DispatchError> {
        let Some(handler) = self.routes.get(&delivery.topic).cloned() else {
            let reason = format!("no handler routed for topic {}", delivery.topic);
            return self.poison(delivery, reason).await;
        };

        let max_attempts = self.config.dispatch_max_attempts.max(1);
        let mut backoff = self.config.retry_backoff();
        for attempt in 1..=max_attempts {
            match handler.handle(delivery.clone()).await {
                Ok(()) => {
                    self.commit(&delivery).await?;
                    debug!(
                        topic = %delivery.topic,
                        offset = %delivery.offset,
                        event_id = delivery.event_id().unwrap_or_default(),
                        "delivery committed"
                    );
                    return Ok(Dispatched::Committed {
                        offset: delivery.offset,
                    });
                }
                Err(HandlerError::Permanent(e)) => {
                    return self.poison(delivery, format!("{e:#}")).await;
                }
                Err(HandlerError::Transient(e)) => {
                    warn!(
                        topic = %delivery.topic,
                        offset = %delivery.offset,
                        attempt,
                        max_attempts,
                        error = %format!("{e:#}"),
                        "handler failed transiently"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(backoff.next_delay()).await;
                    }
                }
            }
        }

        warn!(
            topic = %delivery.topic,
            offset = %delivery.offset,
            "retries exhausted; leaving delivery uncommitted for redelivery"
        );
        Ok(Dispatched::Retained {
            offset: delivery.offset,
        })
    }

    async fn poison(
        &mut self,
        delivery: Delivery,
        reason: String,
    ) -> Result<Dispatched, DispatchError> {
        match self.config.poison_policy {
            PoisonPolicy::DeadLetter => {
                let dead_letter_topic =
                    format!("{}{}", delivery.topic, self.config.dead_letter_suffix);
                let message = OutboundMessage {
                    topic: dead_letter_topic.clone(),
                    key: delivery.key.clone(),
                    payload: delivery.payload.clone(),
                    headers: delivery
                        .headers
                        .clone()
                        .with(HEADER_ERROR, reason.as_str())
                        .with(HEADER_ORIGINAL_TOPIC, delivery.topic.as_str()),
                };
                self.dead_letters.publish(&message).await.map_err(|source| {
                    DispatchError::DeadLetter {
                        offset: delivery.offset.clone(),
                        source,
                    }
                })?;
                self.commit(&delivery).await?;
                error!(
                    topic = %delivery.topic,
                    dead_letter_topic = %dead_letter_topic,
                    offset = %delivery.offset,
                    event_id = delivery.event_id().unwrap_or_default(),
                    reason = %reason,
                    "poison delivery dead-lettered"
                );
                Ok(Dispatched::DeadLettered {
                    offset: delivery.offset,
                    dead_letter_topic,
                })
            }
            PoisonPolicy::SkipAndCommit => {
                self.commit(&delivery).await?;
                error!(
                    topic = %delivery.topic,
                    offset = %delivery.offset,
                    event_id = delivery.event_id().unwrap_or_default(),
                    reason = %reason,
                    "poison delivery skipped"
                );
                Ok(Dispatched::Skipped {
                    offset: delivery.offset,
                })
            }
        }
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), DispatchError> {
        self.subscriber
            .commit(delivery)
            .await
            .map_err(|source| DispatchError::Commit {
                offset: delivery.offset.clone(),
                source,
            })
    }
}

/// Join `config.consumer_group` on `topics`, retrying while the broker is
/// unreachable. Returns `None` if shutdown arrives first.
pub async fn subscribe_with_retry<B: Broker>(
    broker: &B,
    config: &DispatcherConfig,
    topics: &[String],
    shutdown: &mut Shutdown,
) -> Option<B::Subscriber> {
    let mut backoff = config.retry_backoff();
    loop {
        match broker
            .subscribe(&config.consumer_group, &config.consumer_name, topics)
            .await
        {
            Ok(subscriber) => {
                info!(
                    group = %config.consumer_group,
                    consumer = %config.consumer_name,
                    topics = ?topics,
                    "subscribed"
                );
                return Some(subscriber);
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "subscribe failed");
                tokio::select! {
                    _ = shutdown.triggered() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
