use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use conveyor_core::health::{database_ready, healthz};
use conveyor_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::resource::{
    create_resource, delete_resource, get_resource, list_resources, update_resource,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Resources
        .route("/resources", post(create_resource).get(list_resources))
        .route(
            "/resources/{id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}

async fn readyz(State(state): State<AppState>) -> StatusCode {
    database_ready(&state.db).await
}
