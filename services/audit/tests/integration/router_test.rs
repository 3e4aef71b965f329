use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::DatabaseConnection;

use conveyor_audit::router::build_router;
use conveyor_audit::state::AppState;

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
async fn should_reject_bad_limit_and_report_store_failure() {
    server()
        .get("/events?limit=many")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server().get("/events").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "INTERNAL");
}
