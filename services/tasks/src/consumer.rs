//! Wiring between the broker dispatcher and the task processor.

use std::sync::Arc;

use futures::future::BoxFuture;

use conveyor_broker::dispatcher::{
    Dispatcher, DispatcherConfig, Handler, HandlerError, subscribe_with_retry,
};
use conveyor_broker::{Broker, Delivery, Publisher, Subscriber};
use conveyor_core::shutdown::Shutdown;
use conveyor_domain::event::RESOURCE_TOPICS;
use conveyor_domain::id::EventId;

use crate::domain::repository::TaskRepository;
use crate::error::TasksServiceError;
use crate::usecase::process_event::ProcessEventUseCase;

/// Routes resource events into [`ProcessEventUseCase`].
pub struct TaskEventHandler<R: TaskRepository> {
    usecase: Arc<ProcessEventUseCase<R>>,
}

impl<R: TaskRepository> TaskEventHandler<R> {
    pub fn new(repo: R) -> Self {
        Self {
            usecase: Arc::new(ProcessEventUseCase { repo }),
        }
    }
}

impl<R: TaskRepository + 'static> Handler for TaskEventHandler<R> {
    fn handle(&self, delivery: Delivery) -> BoxFuture<'static, Result<(), HandlerError>> {
        let usecase = self.usecase.clone();
        Box::pin(async move { process_delivery(&usecase, delivery).await })
    }
}

async fn process_delivery<R: TaskRepository>(
    usecase: &ProcessEventUseCase<R>,
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
        Err(e @ TasksServiceError::InvalidEvent(_)) => Err(HandlerError::permanent(e)),
        Err(e) => Err(HandlerError::transient(e)),
    }
}

/// Dispatcher over every resource topic, all handled by one shared handler.
pub fn build_dispatcher<S, P, R>(
    subscriber: S,
    dead_letters: P,
    config: DispatcherConfig,
    repo: R,
) -> Dispatcher<S, P>
where
    S: Subscriber,
    P: Publisher,
    R: TaskRepository + 'static,
{
    let handler: Arc<dyn Handler> = Arc::new(TaskEventHandler::new(repo));
    RESOURCE_TOPICS
        .iter()
        .fold(Dispatcher::new(subscriber, dead_letters, config), |d, topic| {
            d.route_shared(*topic, handler.clone())
        })
}

/// Subscribe and dispatch until shutdown. Dead letters go back through `broker`.
pub async fn run_consumer<B, R>(
    broker: B,
    repo: R,
    config: DispatcherConfig,
    mut shutdown: Shutdown,
) where
    B: Broker + Clone,
    R: TaskRepository + 'static,
{
    let topics: Vec<String> = RESOURCE_TOPICS.iter().map(|t| (*t).to_owned()).collect();
    let Some(subscriber) = subscribe_with_retry(&broker, &config, &topics, &mut shutdown).await
    else {
        return;
    };
    build_dispatcher(subscriber, broker, config, repo)
        .run(shutdown)
        .await;
}
