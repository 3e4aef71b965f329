//! Second consumer role: every resource event and every task completion,
//! read under its own consumer group.

use std::sync::Arc;

use futures::future::BoxFuture;

use conveyor_broker::dispatcher::{
    Dispatcher, DispatcherConfig, Handler, HandlerError, subscribe_with_retry,
};
use conveyor_broker::{Broker, Delivery, Publisher, Subscriber};
use conveyor_core::shutdown::Shutdown;
use conveyor_domain::event::{RESOURCE_TOPICS, TASK_COMPLETED};
use conveyor_domain::id::EventId;

use crate::domain::repository::AuditRepository;
use crate::error::AuditServiceError;
use crate::usecase::record_event::RecordEventUseCase;

/// Topics the audit role reads.
pub fn audit_topics() -> Vec<String> {
    RESOURCE_TOPICS
        .iter()
        .chain(std::iter::once(&TASK_COMPLETED))
        .map(|t| (*t).to_owned())
        .collect()
}

pub struct AuditEventHandler<R: AuditRepository> {
    usecase: Arc<RecordEventUseCase<R>>,
}

impl<R: AuditRepository> AuditEventHandler<R> {
    pub fn new(repo: R) -> Self {
        Self {
            usecase: Arc::new(RecordEventUseCase { repo }),
        }
    }
}

impl<R: AuditRepository + 'static> Handler for AuditEventHandler<R> {
    fn handle(&self, delivery: Delivery) -> BoxFuture<'static, Result<(), HandlerError>> {
        let usecase = self.usecase.clone();
        Box::pin(async move { record_delivery(&usecase, delivery).await })
    }
}

async fn record_delivery<R: AuditRepository>(
    usecase: &RecordEventUseCase<R>,
    delivery: Delivery,
) -> Result<(), HandlerError> {
    let event_id: EventId = delivery
        .event_id()
        .ok_or_else(|| HandlerError::permanent(anyhow::anyhow!("missing event_id header")))?
        .parse()
        .map_err(|e| HandlerError::permanent(anyhow::anyhow!("invalid event_id header: {e}")))?;
    let event_type = delivery.event_type().unwrap_or(&delivery.topic);

    match usecase.execute(event_id, event_type, &delivery.payload).await {
        Ok(_) => Ok(()),
        Err(e @ AuditServiceError::InvalidEvent(_)) => Err(HandlerError::permanent(e)),
        Err(e) => Err(HandlerError::transient(e)),
    }
}

pub fn build_dispatcher<S, P, R>(
    subscriber: S,
    dead_letters: P,
    config: DispatcherConfig,
    repo: R,
) -> Dispatcher<S, P>
where
    S: Subscriber,
    P: Publisher,
    R: AuditRepository + 'static,
{
    let handler: Arc<dyn Handler> = Arc::new(AuditEventHandler::new(repo));
    audit_topics()
        .into_iter()
        .fold(Dispatcher::new(subscriber, dead_letters, config), |d, topic| {
            d.route_shared(topic, handler.clone())
        })
}

pub async fn run_consumer<B, R>(
    broker: B,
    repo: R,
    config: DispatcherConfig,
    mut shutdown: Shutdown,
) where
    B: Broker + Clone,
    R: AuditRepository + 'static,
{
    let topics = audit_topics();
    let Some(subscriber) = subscribe_with_retry(&broker, &config, &topics, &mut shutdown).await
    else {
        return;
    };
    build_dispatcher(subscriber, broker, config, repo)
        .run(shutdown)
        .await;
}
