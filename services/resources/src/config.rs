use serde::Deserialize;

use conveyor_core::config::Config;

/// Resources service configuration loaded from environment variables.
///
/// The relay and broker read their own settings (`RELAY_*`, `BROKER_*`).
#[derive(Debug, Deserialize)]
pub struct ResourcesConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3120). Env var: `RESOURCES_PORT`.
    #[serde(default = "default_port")]
    pub resources_port: u16,
}

fn default_port() -> u16 {
    3120
}

impl Config for ResourcesConfig {}
