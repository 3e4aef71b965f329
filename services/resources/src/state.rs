use sea_orm::DatabaseConnection;

use crate::infra::db::DbResourceRepository;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn resource_repo(&self) -> DbResourceRepository {
        DbResourceRepository {
            db: self.db.clone(),
        }
    }
}
