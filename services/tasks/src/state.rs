use sea_orm::DatabaseConnection;

use crate::infra::db::DbTaskRepository;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn task_repo(&self) -> DbTaskRepository {
        DbTaskRepository {
            db: self.db.clone(),
        }
    }
}
