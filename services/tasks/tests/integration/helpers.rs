use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use conveyor_audit::domain::repository::AuditRepository;
use conveyor_audit::domain::types::{AuditRecord, Recorded};
use conveyor_audit::error::AuditServiceError;
use conveyor_broker::{Delivery, Headers, OutboundMessage};
use conveyor_broker::message::{HEADER_EVENT_ID, HEADER_EVENT_TYPE};
use conveyor_domain::event::ResourceChanged;
use conveyor_domain::id::{EventId, TaskId};
use conveyor_domain::task::TaskStatus;
use conveyor_outbox::OutboxEvent;
use conveyor_tasks::domain::repository::TaskRepository;
use conveyor_tasks::domain::types::{Applied, ProcessedTask, TaskTransition};
use conveyor_tasks::error::TasksServiceError;

// ── MockTaskRepo ─────────────────────────────────────────────────────────────

/// In-memory tasks, inbox and outbox. Clones share state, so a test can keep
/// one copy for assertions while another is moved into a handler.
#[derive(Clone, Default)]
pub struct MockTaskRepo {
    pub tasks: Arc<Mutex<HashMap<TaskId, ProcessedTask>>>,
    pub inbox: Arc<Mutex<HashSet<EventId>>>,
    pub outbox: Arc<Mutex<Vec<OutboxEvent>>>,
    /// Number of upcoming `apply` calls to fail before writing anything.
    pub failing_applies: Arc<Mutex<usize>>,
}

impl MockTaskRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_applies(&self, n: usize) {
        *self.failing_applies.lock().unwrap() = n;
    }

    pub fn task(&self, id: TaskId) -> Option<ProcessedTask> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn outbox(&self) -> Vec<OutboxEvent> {
        self.outbox.lock().unwrap().clone()
    }
}

impl TaskRepository for MockTaskRepo {
    async fn find(&self, id: TaskId) -> Result<Option<ProcessedTask>, TasksServiceError> {
        Ok(self.task(id))
    }

    async fn list(&self, limit: u64) -> Result<Vec<ProcessedTask>, TasksServiceError> {
        let mut all: Vec<ProcessedTask> = self.tasks.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn ensure_processing(
        &self,
        transition: &TaskTransition,
    ) -> Result<(), TasksServiceError> {
        self.tasks
            .lock()
            .unwrap()
            .entry(transition.task_id)
            .or_insert_with(|| ProcessedTask {
                id: transition.task_id,
                resource_id: transition.resource_id.clone(),
                action: transition.action.as_str().to_owned(),
                status: TaskStatus::Processing,
                result: None,
                last_event_id: None,
                created_at: transition.at,
                updated_at: transition.at,
            });
        Ok(())
    }

    async fn apply(&self, transition: &TaskTransition) -> Result<Applied, TasksServiceError> {
        {
            let mut failing = self.failing_applies.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(anyhow::anyhow!("connection reset").into());
            }
        }
        let mut inbox = self.inbox.lock().unwrap();
        if inbox.contains(&transition.event_id) {
            return Ok(Applied::Duplicate);
        }
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&transition.task_id)
            .ok_or_else(|| anyhow::anyhow!("task {} not initialized", transition.task_id))?;
        inbox.insert(transition.event_id);
        if task.last_event_id.is_some_and(|last| last >= transition.event_id) {
            return Ok(Applied::Superseded);
        }
        task.action = transition.action.as_str().to_owned();
        task.status = transition.status;
        task.result = Some(transition.result.clone());
        task.last_event_id = Some(transition.event_id);
        task.updated_at = transition.at;
        if let Some(completion) = &transition.completion {
            self.outbox.lock().unwrap().push(completion.clone());
        }
        Ok(Applied::Applied)
    }
}

// ── AuditLog ─────────────────────────────────────────────────────────────────

/// Audit store for tests that run the audit role next to the tasks role.
#[derive(Clone, Default)]
pub struct AuditLog {
    pub records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl AuditLog {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditRepository for AuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<Recorded, AuditServiceError> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.event_id == record.event_id) {
            return Ok(Recorded::Duplicate);
        }
        records.push(record.clone());
        Ok(Recorded::Recorded)
    }

    async fn list(&self, limit: u64) -> Result<Vec<AuditRecord>, AuditServiceError> {
        let mut all = self.records();
        all.reverse();
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

pub fn resource_message(
    event_id: EventId,
    event_type: &str,
    id: &str,
    payload: Vec<u8>,
) -> OutboundMessage {
    OutboundMessage {
        topic: event_type.to_owned(),
        key: id.to_owned(),
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
