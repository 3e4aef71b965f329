//! Redis Streams adapter.
//!
//! One stream per topic (`{prefix}:{topic}`); each consumer role is a Redis
//! consumer group, so roles read the full stream independently while group
//! members share it. Entries stay in the group's pending list until `XACK`,
//! which is what [`Subscriber::commit`] issues.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use deadpool_redis::redis::{self, RedisError};
use deadpool_redis::{Connection, Pool, Runtime};
use serde::Deserialize;
use tracing::{debug, info};

use conveyor_core::config::Config;

use crate::error::BrokerError;
use crate::message::{Delivery, Headers, OutboundMessage};
use crate::port::{Broker, Publisher, Subscriber};

const FIELD_KEY: &str = "key";
const FIELD_VALUE: &str = "value";
const HEADER_FIELD_PREFIX: &str = "h:";
const RECLAIM_BATCH: usize = 16;

/// Redis broker configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisBrokerConfig {
    /// Redis connection URL. Env var: `BROKER_URL`.
    pub broker_url: String,
    /// Stream key prefix (default "conveyor"). Env var: `BROKER_STREAM_PREFIX`.
    #[serde(default = "default_stream_prefix")]
    pub broker_stream_prefix: String,
    /// How long one fetch blocks waiting for new entries (default 1000).
    #[serde(default = "default_block_ms")]
    pub broker_block_ms: u64,
    /// Pending entries idle longer than this are reclaimed and redelivered
    /// (default 30000). Env var: `BROKER_REDELIVER_AFTER_MS`.
    #[serde(default = "default_redeliver_after_ms")]
    pub broker_redeliver_after_ms: u64,
    /// Approximate cap on stream length; unset keeps everything.
    #[serde(default)]
    pub broker_max_stream_len: Option<u64>,
}

fn default_stream_prefix() -> String {
    "conveyor".to_owned()
}

fn default_block_ms() -> u64 {
    1000
}

fn default_redeliver_after_ms() -> u64 {
    30_000
}

impl Config for RedisBrokerConfig {}

#[derive(Clone)]
pub struct RedisStreamBroker {
    pool: Pool,
    prefix: String,
    block_ms: u64,
    redeliver_after: Duration,
    max_len: Option<u64>,
}

impl RedisStreamBroker {
    pub fn new(pool: Pool, config: &RedisBrokerConfig) -> Self {
        Self {
            pool,
            prefix: config.broker_stream_prefix.clone(),
            block_ms: config.broker_block_ms,
            redeliver_after: Duration::from_millis(config.broker_redeliver_after_ms),
            max_len: config.broker_max_stream_len,
        }
    }

    /// Build a connection pool from `BROKER_URL`. Connections open lazily.
    pub fn connect(config: &RedisBrokerConfig) -> Result<Self, BrokerError> {
        let pool = deadpool_redis::Config::from_url(&config.broker_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| BrokerError::Rejected(format!("invalid broker config: {e}")))?;
        Ok(Self::new(pool, config))
    }

    fn stream_key(&self, topic: &str) -> String {
        format!("{}:{}", self.prefix, topic)
    }

    async fn conn(&self) -> Result<Connection, BrokerError> {
        self.pool
            .get()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))
    }
}

fn map_redis_error(e: RedisError) -> BrokerError {
    if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal()
    {
        BrokerError::Unavailable(e.to_string())
    } else {
        BrokerError::Rejected(e.to_string())
    }
}

impl Publisher for RedisStreamBroker {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), BrokerError> {
        let mut conn = self.conn().await?;
        let stream = self.stream_key(&message.topic);

        let mut cmd = redis::cmd("XADD");
        cmd.arg(&stream);
        if let Some(max_len) = self.max_len {
            cmd.arg("MAXLEN").arg("~").arg(max_len);
        }
        cmd.arg("*")
            .arg(FIELD_KEY)
            .arg(message.key.as_bytes())
            .arg(FIELD_VALUE)
            .arg(&message.payload[..]);
        for (name, value) in message.headers.iter() {
            cmd.arg(format!("{HEADER_FIELD_PREFIX}{name}")).arg(value);
        }

        let entry_id: String = cmd.query_async(&mut conn).await.map_err(map_redis_error)?;
        debug!(stream = %stream, entry_id = %entry_id, key = %message.key, "entry appended");
        Ok(())
    }
}

impl Broker for RedisStreamBroker {
    type Subscriber = RedisSubscriber;

    async fn subscribe(
        &self,
        group: &str,
        consumer: &str,
        topics: &[String],
    ) -> Result<RedisSubscriber, BrokerError> {
        let mut conn = self.conn().await?;
        for topic in topics {
            let stream = self.stream_key(topic);
            // Start at "0" so a new role also sees entries appended before it existed.
            let created: Result<(), RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(&stream)
                .arg(group)
                .arg("0")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;
            match created {
                Ok(()) => info!(stream = %stream, group, "consumer group created"),
                Err(e) if e.code() == Some("BUSYGROUP") => {}
                Err(e) => return Err(map_redis_error(e)),
            }
        }

        Ok(RedisSubscriber {
            broker: self.clone(),
            group: group.to_owned(),
            consumer: consumer.to_owned(),
            topics: topics.to_vec(),
            recovery_cursors: topics.iter().map(|t| (t.clone(), "0".to_owned())).collect(),
            buffer: VecDeque::new(),
            last_reclaim: Instant::now(),
        })
    }
}

type StreamEntry = (String, HashMap<String, Vec<u8>>);
type StreamReadReply = Option<Vec<(String, Vec<StreamEntry>)>>;

/// Consumer-group member over one or more topic streams.
///
/// Fetch order: first this consumer's own unacknowledged entries (left over
/// from a previous run), then entries of any member idle past the
/// redelivery window, then new entries.
pub struct RedisSubscriber {
    broker: RedisStreamBroker,
    group: String,
    consumer: String,
    topics: Vec<String>,
    /// Per-topic cursor through our own pending list; emptied once drained.
    recovery_cursors: Vec<(String, String)>,
    buffer: VecDeque<Delivery>,
    last_reclaim: Instant,
}

impl RedisSubscriber {
    fn topic_for_stream(&self, stream: &str) -> Option<&str> {
        let suffix = stream.strip_prefix(&self.broker.prefix)?.strip_prefix(':')?;
        self.topics.iter().find(|t| *t == suffix).map(String::as_str)
    }

    async fn recover_own_pending(&mut self) -> Result<Option<Delivery>, BrokerError> {
        while let Some((topic, cursor)) = self.recovery_cursors.first().cloned() {
            let mut conn = self.broker.conn().await?;
            let stream = self.broker.stream_key(&topic);
            let reply: StreamReadReply = redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.group)
                .arg(&self.consumer)
                .arg("COUNT")
                .arg(1)
                .arg("STREAMS")
                .arg(&stream)
                .arg(&cursor)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;

            let entry = reply
                .into_iter()
                .flatten()
                .flat_map(|(_, entries)| entries)
                .next();
            match entry {
                Some((id, fields)) => {
                    self.recovery_cursors[0].1 = id.clone();
                    if fields.is_empty() {
                        // Trimmed away while pending; nothing left to deliver.
                        self.ack(&stream, &id).await?;
                        continue;
                    }
                    return Ok(Some(decode_entry(&topic, id, fields, true)));
                }
                None => {
                    self.recovery_cursors.remove(0);
                }
            }
        }
        Ok(None)
    }

    async fn reclaim_stale(&mut self) -> Result<(), BrokerError> {
        let min_idle = self.broker.redeliver_after.as_millis() as u64;
        let mut conn = self.broker.conn().await?;
        for topic in &self.topics {
            let stream = self.broker.stream_key(topic);
            let pending: Vec<(String, String, u64, u64)> =
                stale_pending_cmd(&stream, &self.group, min_idle)
                    .query_async(&mut conn)
                    .await
                    .map_err(map_redis_error)?;

            let stale: Vec<&str> = pending.iter().map(|(id, _, _, _)| id.as_str()).collect();
            if stale.is_empty() {
                continue;
            }

            let claimed: Vec<Option<StreamEntry>> = redis::cmd("XCLAIM")
                .arg(&stream)
                .arg(&self.group)
                .arg(&self.consumer)
                .arg(min_idle)
                .arg(&stale)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;

            for (id, fields) in claimed.into_iter().flatten() {
                if fields.is_empty() {
                    continue;
                }
                debug!(stream = %stream, entry_id = %id, "reclaimed stale entry");
                self.buffer.push_back(decode_entry(topic, id, fields, true));
            }
        }
        Ok(())
    }

    async fn read_new(&mut self) -> Result<(), BrokerError> {
        let mut conn = self.broker.conn().await?;
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(self.broker.block_ms)
            .arg("STREAMS");
        for topic in &self.topics {
            cmd.arg(self.broker.stream_key(topic));
        }
        for _ in &self.topics {
            cmd.arg(">");
        }

        let reply: StreamReadReply = cmd.query_async(&mut conn).await.map_err(map_redis_error)?;
        for (stream, entries) in reply.into_iter().flatten() {
            let Some(topic) = self.topic_for_stream(&stream).map(str::to_owned) else {
                continue;
            };
            for (id, fields) in entries {
                self.buffer
                    .push_back(decode_entry(&topic, id, fields, false));
            }
        }
        Ok(())
    }

    async fn ack(&self, stream: &str, id: &str) -> Result<(), BrokerError> {
        let mut conn = self.broker.conn().await?;
        let _acked: i64 = redis::cmd("XACK")
            .arg(stream)
            .arg(&self.group)
            .arg(id)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

impl Subscriber for RedisSubscriber {
    async fn fetch(&mut self) -> Result<Option<Delivery>, BrokerError> {
        if let Some(delivery) = self.buffer.pop_front() {
            return Ok(Some(delivery));
        }
        if !self.recovery_cursors.is_empty() {
            if let Some(delivery) = self.recover_own_pending().await? {
                return Ok(Some(delivery));
            }
        }
        if self.last_reclaim.elapsed() >= self.broker.redeliver_after {
            self.last_reclaim = Instant::now();
            self.reclaim_stale().await?;
            if let Some(delivery) = self.buffer.pop_front() {
                return Ok(Some(delivery));
            }
        }
        self.read_new().await?;
        Ok(self.buffer.pop_front())
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError> {
        let stream = self.broker.stream_key(&delivery.topic);
        self.ack(&stream, &delivery.offset).await
    }
}

/// Rebuild a delivery from stream entry fields. Missing fields decode as
/// empty so a malformed entry still reaches the dispatcher's poison handling.
fn decode_entry(
    topic: &str,
    id: String,
    mut fields: HashMap<String, Vec<u8>>,
    redelivered: bool,
) -> Delivery {
    let key = fields
        .remove(FIELD_KEY)
        .map(|k| String::from_utf8_lossy(&k).into_owned())
        .unwrap_or_default();
    let payload = fields.remove(FIELD_VALUE).unwrap_or_default();
    let mut headers = Headers::new();
    for (field, value) in fields {
        if let Some(name) = field.strip_prefix(HEADER_FIELD_PREFIX) {
            headers.insert(name, String::from_utf8_lossy(&value).into_owned());
        }
    }
    Delivery {
        topic: topic.to_owned(),
        key,
        payload,
        headers,
        offset: id,
        redelivered,
    }
}

/// Up to [`RECLAIM_BATCH`] pending entries idle for at least `min_idle_ms`.
///
/// The idle filter runs server side (Redis 6.2+), so a backlog of young
/// pending entries cannot hide older stale ones behind the batch limit.
fn stale_pending_cmd(stream: &str, group: &str, min_idle_ms: u64) -> redis::Cmd {
    let mut cmd = redis::cmd("XPENDING");
    cmd.arg(stream)
        .arg(group)
        .arg("IDLE")
        .arg(min_idle_ms)
        .arg("-")
        .arg("+")
        .arg(RECLAIM_BATCH);
    cmd
}
