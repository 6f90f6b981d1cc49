//! Integration tests for the health check and WebSocket upgrade.

mod helpers;

use http::StatusCode;

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["database"], "connected");
    assert_eq!(response.body["data"]["ws_connections"], 0);
}

#[tokio::test]
async fn test_ws_upgrade_without_token() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/ws", None, None).await;

    assert!(
        response.status == StatusCode::UNAUTHORIZED
            || response.status == StatusCode::BAD_REQUEST
            || response.status == StatusCode::UPGRADE_REQUIRED,
        "Expected 401, 400, or 426, got {}",
        response.status
    );
}
