use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use conveyor_outbox::OutboxEvent;
use conveyor_resources::domain::repository::ResourceRepository;
use conveyor_resources::domain::types::{Resource, ResourceUpdate};
use conveyor_resources::error::ResourcesServiceError;

// ── MockResourceRepo ─────────────────────────────────────────────────────────

/// Applies writes to in-memory vectors; `fail_writes` makes every write
/// return an internal error with nothing recorded, like a rolled-back
/// transaction.
#[derive(Default)]
pub struct MockResourceRepo {
    pub resources: Arc<Mutex<Vec<Resource>>>,
    pub outbox: Arc<Mutex<Vec<OutboxEvent>>>,
    pub fail_writes: bool,
}

impl MockResourceRepo {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources: Arc::new(Mutex::new(resources)),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn resources_handle(&self) -> Arc<Mutex<Vec<Resource>>> {
        Arc::clone(&self.resources)
    }

    pub fn outbox_handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.outbox)
    }

    fn check_writable(&self) -> Result<(), ResourcesServiceError> {
        if self.fail_writes {
            return Err(anyhow::anyhow!("transaction aborted").into());
        }
        Ok(())
    }
}

impl ResourceRepository for MockResourceRepo {
    async fn find(&self, id: Uuid) -> Result<Option<Resource>, ResourcesServiceError> {
        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list(&self, limit: u64) -> Result<Vec<Resource>, ResourcesServiceError> {
        let mut all = self.resources.lock().unwrap().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn create_with_outbox(
        &self,
        resource: &Resource,
        event: &OutboxEvent,
    ) -> Result<(), ResourcesServiceError> {
        self.check_writable()?;
        self.resources.lock().unwrap().push(resource.clone());
        self.outbox.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn update_with_outbox(
        &self,
        update: &ResourceUpdate,
        event: &OutboxEvent,
    ) -> Result<Option<Resource>, ResourcesServiceError> {
        self.check_writable()?;
        let mut resources = self.resources.lock().unwrap();
        let Some(existing) = resources.iter_mut().find(|r| r.id == update.id) else {
            return Ok(None);
        };
        existing.name = update.name.clone();
        existing.description = update.description.clone();
        existing.status = update.status.clone();
        existing.updated_at = update.updated_at;
        self.outbox.lock().unwrap().push(event.clone());
        Ok(Some(existing.clone()))
    }

    async fn delete_with_outbox(
        &self,
        id: Uuid,
        event: &OutboxEvent,
    ) -> Result<bool, ResourcesServiceError> {
        self.check_writable()?;
        let mut resources = self.resources.lock().unwrap();
        let before = resources.len();
        resources.retain(|r| r.id != id);
        if resources.len() == before {
            return Ok(false);
        }
        self.outbox.lock().unwrap().push(event.clone());
        Ok(true)
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_resource(name: &str) -> Resource {
    let now = Utc::now();
    Resource {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        description: String::new(),
        status: "active".to_owned(),
        created_at: now,
        updated_at: now,
    }
}
