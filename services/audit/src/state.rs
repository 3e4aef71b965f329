use sea_orm::DatabaseConnection;

use crate::infra::db::DbAuditRepository;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn audit_repo(&self) -> DbAuditRepository {
        DbAuditRepository {
            db: self.db.clone(),
        }
    }
}
