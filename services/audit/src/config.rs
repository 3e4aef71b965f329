use serde::Deserialize;

use conveyor_core::config::Config;

/// Audit service configuration loaded from environment variables.
///
/// The dispatcher and broker read their own settings
/// (`CONSUMER_*`/`DISPATCH_*`, `BROKER_*`). Run it under its own
/// `CONSUMER_GROUP` (conventionally `audit-worker`) so it sees every event
/// independently of the tasks service.
#[derive(Debug, Deserialize)]
pub struct AuditConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3122). Env var: `AUDIT_PORT`.
    #[serde(default = "default_port")]
    pub audit_port: u16,
}

fn default_port() -> u16 {
    3122
}

impl Config for AuditConfig {}
