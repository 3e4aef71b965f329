use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use conveyor_domain::id::EventId;
use conveyor_outbox::{ClaimedBatch, OutboxError, OutboxEvent, OutboxStore};

/// One record handed to one relay, for asserting claim exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    pub relay_id: String,
    pub event_id: EventId,
    pub claimed_at: DateTime<Utc>,
}

/// Outbox table held in memory.
///
/// Claimed ids are locked until the batch finishes or drops, mirroring
/// `FOR UPDATE SKIP LOCKED`; marks are buffered on the batch and only
/// applied by `finish`, mirroring the claim transaction.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    rows: Vec<Row>,
    locked: HashSet<EventId>,
    claims: Vec<ClaimRecord>,
    fail_claims: usize,
}

struct Row {
    event: OutboxEvent,
    published_at: Option<DateTime<Utc>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert as a committed producer transaction would.
    pub fn append(&self, event: OutboxEvent) {
        self.state.lock().unwrap().rows.push(Row {
            event,
            published_at: None,
        });
    }

    pub fn fail_next_claims(&self, n: usize) {
        self.state.lock().unwrap().fail_claims = n;
    }

    pub fn published_at(&self, id: EventId) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .find(|r| r.event.id == id)
            .and_then(|r| r.published_at)
    }

    pub fn pending_ids(&self) -> Vec<EventId> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .filter(|r| r.published_at.is_none())
            .map(|r| r.event.id)
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    pub fn claim_log(&self) -> Vec<ClaimRecord> {
        self.state.lock().unwrap().claims.clone()
    }
}

impl OutboxStore for InMemoryOutboxStore {
    type Batch = InMemoryClaimedBatch;

    async fn claim_pending(
        &self,
        relay_id: &str,
        limit: u64,
    ) -> Result<InMemoryClaimedBatch, OutboxError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if state.fail_claims > 0 {
            state.fail_claims -= 1;
            return Err(OutboxError::Store(anyhow::anyhow!("injected claim failure")));
        }

        let mut candidates: Vec<&Row> = state
            .rows
            .iter()
            .filter(|r| r.published_at.is_none() && !state.locked.contains(&r.event.id))
            .collect();
        candidates.sort_by_key(|r| (r.event.created_at, r.event.id));
        let records: Vec<OutboxEvent> = candidates
            .into_iter()
            .take(limit as usize)
            .map(|r| r.event.clone())
            .collect();

        let now = Utc::now();
        for record in &records {
            state.locked.insert(record.id);
            state.claims.push(ClaimRecord {
                relay_id: relay_id.to_owned(),
                event_id: record.id,
                claimed_at: now,
            });
        }

        Ok(InMemoryClaimedBatch {
            state: Arc::clone(&self.state),
            records,
            marks: Vec::new(),
        })
    }

    async fn pending_count(&self) -> Result<u64, OutboxError> {
        Ok(self.pending_ids().len() as u64)
    }
}

pub struct InMemoryClaimedBatch {
    state: Arc<Mutex<StoreState>>,
    records: Vec<OutboxEvent>,
    marks: Vec<EventId>,
}

impl ClaimedBatch for InMemoryClaimedBatch {
    fn records(&self) -> &[OutboxEvent] {
        &self.records
    }

    async fn mark_published(&mut self, id: EventId) -> Result<bool, OutboxError> {
        if self.marks.contains(&id) {
            return Ok(false);
        }
        let already = self
            .state
            .lock()
            .unwrap()
            .rows
            .iter()
            .any(|r| r.event.id == id && r.published_at.is_some());
        if already {
            return Ok(false);
        }
        self.marks.push(id);
        Ok(true)
    }

    async fn finish(mut self) -> Result<(), OutboxError> {
        let marks = std::mem::take(&mut self.marks);
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        for row in state.rows.iter_mut() {
            if row.published_at.is_none() && marks.contains(&row.event.id) {
                row.published_at = Some(now);
            }
        }
        Ok(())
    }
}

impl Drop for InMemoryClaimedBatch {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            for record in &self.records {
                state.locked.remove(&record.id);
            }
        }
    }
}
