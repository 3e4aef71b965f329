use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::DatabaseConnection;

use conveyor_resources::router::build_router;
use conveyor_resources::state::AppState;

fn server() -> TestServer {
    let state = AppState {
        db: DatabaseConnection::Disconnected,
    };
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn should_be_live_but_not_ready_without_database() {
    let server = server();
    server.get("/healthz").await.assert_status_ok();
    server
        .get("/readyz")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_attach_request_id() {
    let response = server().get("/healthz").await;
    let id = response.header("x-request-id");
    assert!(!id.is_empty());
}

#[tokio::test]
async fn should_reject_malformed_resource_id() {
    let response = server().get("/resources/not-a-uuid").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
