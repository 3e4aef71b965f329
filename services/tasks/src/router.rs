use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::TraceLayer;

use conveyor_core::health::{database_ready, healthz};
use conveyor_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::task::{get_task, list_tasks};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Tasks
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", get(get_task))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}

async fn readyz(State(state): State<AppState>) -> StatusCode {
    database_ready(&state.db).await
}
