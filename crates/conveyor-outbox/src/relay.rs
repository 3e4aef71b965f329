use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use conveyor_broker::{BrokerError, Publisher};
use conveyor_core::backoff::Backoff;
use conveyor_core::config::Config;
use conveyor_core::shutdown::Shutdown;
use conveyor_domain::id::AggregateId;

use crate::store::{ClaimedBatch, OutboxError, OutboxStore};

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Sleep between cycles that found less than a full batch.
    #[serde(default = "default_poll_interval_ms")]
    pub relay_poll_interval_ms: u64,
    #[serde(default = "default_batch_size")]
    pub relay_batch_size: u64,
    /// Tag for this relay in logs and claim records (default `$HOSTNAME`).
    #[serde(default = "default_instance_id")]
    pub relay_instance_id: String,
    /// Backoff cap after consecutive store failures.
    #[serde(default = "default_retry_max_ms")]
    pub relay_retry_max_ms: u64,
    /// Longest a single publish may take before it counts as a transient
    /// failure. The claim's row locks are held across the batch, so this
    /// bounds how long a stalled broker can keep them.
    #[serde(default = "default_publish_timeout_ms")]
    pub relay_publish_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> u64 {
    100
}

fn default_instance_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "relay".to_owned())
}

fn default_retry_max_ms() -> u64 {
    30_000
}

fn default_publish_timeout_ms() -> u64 {
    5_000
}

impl Config for RelayConfig {}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_poll_interval_ms: default_poll_interval_ms(),
            relay_batch_size: default_batch_size(),
            relay_instance_id: default_instance_id(),
            relay_retry_max_ms: default_retry_max_ms(),
            relay_publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

/// Counts for one relay cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub claimed: usize,
    pub published: usize,
    pub failed: usize,
    /// Held back because an earlier record of the same aggregate failed.
    pub skipped: usize,
}

pub struct OutboxRelay<S, P> {
    store: S,
    publisher: P,
    config: RelayConfig,
}

impl<S, P> OutboxRelay<S, P>
where
    S: OutboxStore,
    P: Publisher,
{
    pub fn new(store: S, publisher: P, config: RelayConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Claim one batch, publish it in order and mark what went out.
    ///
    /// After a publish failure the rest of that aggregate's records in the
    /// batch are left pending so they cannot overtake the failed one.
    pub async fn run_once(&self) -> Result<RelayReport, OutboxError> {
        let relay_id = self.config.relay_instance_id.as_str();
        let mut batch = self
            .store
            .claim_pending(relay_id, self.config.relay_batch_size)
            .await?;
        let records = batch.records().to_vec();
        let mut report = RelayReport {
            claimed: records.len(),
            ..RelayReport::default()
        };
        let mut blocked: HashSet<AggregateId> = HashSet::new();
        let publish_timeout = Duration::from_millis(self.config.relay_publish_timeout_ms);

        for record in &records {
            if blocked.contains(&record.aggregate_id) {
                report.skipped += 1;
                continue;
            }
            let published =
                tokio::time::timeout(publish_timeout, self.publisher.publish(&record.to_message()))
                    .await
                    .unwrap_or_else(|_| {
                        Err(BrokerError::Unavailable(format!(
                            "publish timed out after {}ms",
                            publish_timeout.as_millis()
                        )))
                    });
            match published {
                Ok(()) => {
                    if !batch.mark_published(record.id).await? {
                        debug!(relay_id, event_id = %record.id, "outbox event already marked");
                    }
                    report.published += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        relay_id,
                        event_id = %record.id,
                        aggregate_id = %record.aggregate_id,
                        error = %e,
                        "publish failed; event stays pending"
                    );
                    report.failed += 1;
                    blocked.insert(record.aggregate_id.clone());
                }
                Err(e) => {
                    error!(
                        relay_id,
                        event_id = %record.id,
                        event_type = %record.event_type,
                        aggregate_id = %record.aggregate_id,
                        error = %e,
                        "broker refused event; it stays pending"
                    );
                    report.failed += 1;
                    blocked.insert(record.aggregate_id.clone());
                }
            }
        }

        batch.finish().await?;
        Ok(report)
    }

    /// Relay until `shutdown` fires. A batch in flight is finished first.
    pub async fn run(self, mut shutdown: Shutdown) {
        let relay_id = self.config.relay_instance_id.clone();
        let poll_interval = Duration::from_millis(self.config.relay_poll_interval_ms);
        let mut backoff = Backoff::new(
            poll_interval,
            Duration::from_millis(self.config.relay_retry_max_ms),
        );
        match self.store.pending_count().await {
            Ok(pending) => info!(
                relay_id = %relay_id,
                batch_size = self.config.relay_batch_size,
                pending,
                "outbox relay started"
            ),
            Err(e) => warn!(relay_id = %relay_id, error = %e, "outbox relay started; backlog unknown"),
        }

        while !shutdown.is_triggered() {
            let delay = match self.run_once().await {
                Ok(report) => {
                    backoff.reset();
                    if report.claimed == 0 {
                        debug!(relay_id = %relay_id, "no pending outbox events");
                    } else {
                        info!(
                            relay_id = %relay_id,
                            claimed = report.claimed,
                            published = report.published,
                            failed = report.failed,
                            skipped = report.skipped,
                            "outbox batch relayed"
                        );
                    }
                    let full = report.claimed as u64 >= self.config.relay_batch_size;
                    if full && report.failed == 0 {
                        continue;
                    }
                    poll_interval
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        relay_id = %relay_id,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "outbox relay cycle failed"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(relay_id = %relay_id, "outbox relay stopped");
    }
}
