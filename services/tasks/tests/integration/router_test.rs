use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::DatabaseConnection;

use conveyor_tasks::router::build_router;
use conveyor_tasks::state::AppState;

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
async fn should_reject_malformed_task_id() {
    let response = server().get("/tasks/not-a-uuid").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_report_store_failure_as_internal() {
    let response = server()
        .get("/tasks/0191e5a8-7b1c-7d2e-9f30-1a2b3c4d5e6f")
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "INTERNAL");
}

#[tokio::test]
async fn should_route_task_list_and_reject_bad_page_size() {
    server()
        .get("/tasks?page_size=abc")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server()
        .get("/tasks?page_size=10")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}
