use sea_orm::Database;
use tracing::info;

use conveyor_broker::dispatcher::DispatcherConfig;
use conveyor_broker::redis::{RedisBrokerConfig, RedisStreamBroker};
use conveyor_core::config::Config;
use conveyor_core::shutdown;
use conveyor_core::tracing::init_tracing;
use conveyor_outbox::{DbOutboxStore, OutboxRelay, RelayConfig};

use conveyor_tasks::config::TasksConfig;
use conveyor_tasks::consumer::run_consumer;
use conveyor_tasks::infra::db::DbTaskRepository;
use conveyor_tasks::router::build_router;
use conveyor_tasks::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = TasksConfig::from_env().expect("invalid tasks configuration");
    let dispatcher_config = DispatcherConfig::from_env().expect("invalid consumer configuration");
    let relay_config = RelayConfig::from_env().expect("invalid relay configuration");
    let broker_config = RedisBrokerConfig::from_env().expect("invalid broker configuration");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let broker = RedisStreamBroker::connect(&broker_config).expect("failed to create broker pool");

    let (trigger, shutdown) = shutdown::channel();

    // Relay loop for task.completed
    let relay = OutboxRelay::new(DbOutboxStore { db: db.clone() }, broker.clone(), relay_config);
    let relay_task = tokio::spawn(relay.run(shutdown.clone()));

    // Consumer loop
    let consumer_task = tokio::spawn(run_consumer(
        broker,
        DbTaskRepository { db: db.clone() },
        dispatcher_config,
        shutdown.clone(),
    ));

    // HTTP server
    let router = build_router(AppState { db });
    let addr = format!("0.0.0.0:{}", config.tasks_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("tasks service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown::wait_for_signal().await;
            trigger.trigger();
        })
        .await
        .expect("server error");

    for (name, task) in [("relay", relay_task), ("consumer", consumer_task)] {
        if let Err(e) = task.await {
            tracing::error!(error = %e, task = name, "background task panicked");
        }
    }
    info!("tasks service stopped");
}
