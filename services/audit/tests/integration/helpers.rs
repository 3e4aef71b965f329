use std::sync::{Arc, Mutex};

use conveyor_audit::domain::repository::AuditRepository;
use conveyor_audit::domain::types::{AuditRecord, Recorded};
use conveyor_audit::error::AuditServiceError;
use conveyor_broker::message::{HEADER_EVENT_ID, HEADER_EVENT_TYPE};
use conveyor_broker::{Delivery, Headers, OutboundMessage};
use conveyor_domain::event::{ResourceChanged, TaskCompleted};
use conveyor_domain::id::EventId;

// ── MockAuditRepo ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockAuditRepo {
    pub records: Arc<Mutex<Vec<AuditRecord>>>,
    /// Number of upcoming `record` calls to fail.
    pub failing_records: Arc<Mutex<usize>>,
}

impl MockAuditRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_records(&self, n: usize) {
        *self.failing_records.lock().unwrap() = n;
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditRepository for MockAuditRepo {
    async fn record(&self, record: &AuditRecord) -> Result<Recorded, AuditServiceError> {
        {
            let mut failing = self.failing_records.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(AuditServiceError::Internal(anyhow::anyhow!(
                    "injected store failure"
                )));
            }
        }
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.event_id == record.event_id) {
            return Ok(Recorded::Duplicate);
        }
        records.push(record.clone());
        Ok(Recorded::Recorded)
    }

    async fn list(&self, limit: u64) -> Result<Vec<AuditRecord>, AuditServiceError> {
        let mut all = self.records();
        all.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn resource_changed(id: &str, name: &str) -> Vec<u8> {
    serde_json::to_vec(&ResourceChanged {
        id: id.to_owned(),
        name: name.to_owned(),
        description: String::new(),
        status: "active".to_owned(),
    })
    .unwrap()
}

pub fn task_completed(task_id: &str, resource_id: &str, action: &str) -> Vec<u8> {
    serde_json::to_vec(&TaskCompleted {
        task_id: task_id.to_owned(),
        resource_id: resource_id.to_owned(),
        action: action.to_owned(),
        status: "completed".to_owned(),
    })
    .unwrap()
}

pub fn message(event_id: EventId, event_type: &str, key: &str, payload: Vec<u8>) -> OutboundMessage {
    OutboundMessage {
        topic: event_type.to_owned(),
        key: key.to_owned(),
        payload,
        headers: Headers::new()
            .with(HEADER_EVENT_ID, event_id.to_string())
            .with(HEADER_EVENT_TYPE, event_type),
    }
}

pub fn delivery(message: &OutboundMessage, offset: &str) -> Delivery {
    Delivery {
        topic: message.topic.clone(),
        key: message.key.clone(),
        payload: message.payload.clone(),
        headers: message.headers.clone(),
        offset: offset.to_owned(),
        redelivered: false,
    }
}
