use serde::Deserialize;

use conveyor_core::config::Config;

/// Tasks service configuration loaded from environment variables.
///
/// The dispatcher, relay and broker read their own settings
/// (`CONSUMER_*`/`DISPATCH_*`, `RELAY_*`, `BROKER_*`).
#[derive(Debug, Deserialize)]
pub struct TasksConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3121). Env var: `TASKS_PORT`.
    #[serde(default = "default_port")]
    pub tasks_port: u16,
}

fn default_port() -> u16 {
    3121
}

impl Config for TasksConfig {}
