use sea_orm::Database;
use tracing::info;

use conveyor_broker::redis::{RedisBrokerConfig, RedisStreamBroker};
use conveyor_core::config::Config;
use conveyor_core::shutdown;
use conveyor_core::tracing::init_tracing;
use conveyor_outbox::{DbOutboxStore, OutboxRelay, RelayConfig};

use conveyor_resources::config::ResourcesConfig;
use conveyor_resources::router::build_router;
use conveyor_resources::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ResourcesConfig::from_env().expect("invalid resources configuration");
    let relay_config = RelayConfig::from_env().expect("invalid relay configuration");
    let broker_config = RedisBrokerConfig::from_env().expect("invalid broker configuration");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let broker = RedisStreamBroker::connect(&broker_config).expect("failed to create broker pool");

    let (trigger, shutdown) = shutdown::channel();

    // Relay loop
    let relay = OutboxRelay::new(DbOutboxStore { db: db.clone() }, broker, relay_config);
    let relay_task = tokio::spawn(relay.run(shutdown.clone()));

    // HTTP server
    let router = build_router(AppState { db });
    let addr = format!("0.0.0.0:{}", config.resources_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("resources service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown::wait_for_signal().await;
            trigger.trigger();
        })
        .await
        .expect("server error");

    if let Err(e) = relay_task.await {
        tracing::error!(error = %e, "relay task panicked");
    }
    info!("resources service stopped");
}
