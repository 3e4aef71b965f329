use sea_orm::Database;
use tracing::info;

use conveyor_broker::dispatcher::DispatcherConfig;
use conveyor_broker::redis::{RedisBrokerConfig, RedisStreamBroker};
use conveyor_core::config::Config;
use conveyor_core::shutdown;
use conveyor_core::tracing::init_tracing;

use conveyor_audit::config::AuditConfig;
use conveyor_audit::consumer::run_consumer;
use conveyor_audit::infra::db::DbAuditRepository;
use conveyor_audit::router::build_router;
use conveyor_audit::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AuditConfig::from_env().expect("invalid audit configuration");
    let dispatcher_config = DispatcherConfig::from_env().expect("invalid consumer configuration");
    let broker_config = RedisBrokerConfig::from_env().expect("invalid broker configuration");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let broker = RedisStreamBroker::connect(&broker_config).expect("failed to create broker pool");

    let (trigger, shutdown) = shutdown::channel();

    let consumer_task = tokio::spawn(run_consumer(
        broker,
        DbAuditRepository { db: db.clone() },
        dispatcher_config,
        shutdown.clone(),
    ));

    let router = build_router(AppState { db });
    let addr = format!("0.0.0.0:{}", config.audit_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("audit service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown::wait_for_signal().await;
            trigger.trigger();
        })
        .await
        .expect("server error");

    if let Err(e) = consumer_task.await {
        tracing::error!(error = %e, "consumer task panicked");
    }
    info!("audit service stopped");
}
