use axum::http::StatusCode;
use serde_json::{Value, json};

mod blog;
mod collect;
mod keywords;
mod leads;
mod newsletter;

use common::{ADMIN_TOKEN, TestApp};

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/feeds").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    let response = app
        .server
        .get("/api/feeds")
        .authorization_bearer("wrong-token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/feeds")
        .authorization_bearer(ADMIN_TOKEN)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "success": true, "feeds": [] }));
}

#[tokio::test]
async fn test_admin_routes_open_without_configured_token() {
    let app = TestApp::with_config(|config| config.admin_token = None);

    let response = app.server.get("/api/feeds").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_storage_serves_objects_with_content_type() {
    let app = TestApp::new();
    app.seed_keywords(&["logistics"]).await;

    let response = app.server.get("/storage/keywords/keywords.json").await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/json"
    );
    let body: Value = response.json();
    assert_eq!(body, json!(["logistics"]));

    let response = app.server.get("/storage/missing/file.png").await;
    response.assert_status(StatusCode::NOT_FOUND);
}
